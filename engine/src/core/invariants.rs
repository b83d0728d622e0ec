//! Semantic script invariants not expressible via JSON Schema.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;

use crate::core::path::{UnitPath, page_paths};
use crate::core::types::ConditionTag;
use crate::script::{BlockContent, BlockSpec, RunIfSpec, Script};

/// Check semantic invariants not expressible in JSON Schema:
/// - Each block has exactly one of `blocks`, `pages`, `groups`
/// - No duplicate ids among siblings
/// - `exchangeable`/`counterbalance` name existing block children and are disjoint
/// - `latinSquare` only with `groups`; `pseudorandom` only with tagged, balanced pages
/// - `cutoff > 0`, `criterion` finite and non-negative
/// - `runIf` targets resolve to exactly one page; regexes compile
pub fn validate_invariants(script: &Script) -> Vec<String> {
    let mut errors = Vec::new();
    let root = UnitPath::root();
    let ids: Vec<&str> = script.blocks.iter().map(|b| b.id.as_str()).collect();
    check_siblings("experiment", &ids, &mut errors);
    check_ordering_sets(
        "experiment",
        &ids,
        &script.exchangeable,
        &script.counterbalance,
        &mut errors,
    );
    for block in &script.blocks {
        validate_block(script, block, &root, &mut errors);
    }
    errors
}

fn validate_block(script: &Script, block: &BlockSpec, parent: &UnitPath, errors: &mut Vec<String>) {
    let path = parent.child(&block.id);

    if block.cutoff == 0 {
        errors.push(format!("{path}: cutoff must be > 0"));
    }
    if let Some(criterion) = block.criterion
        && (!criterion.is_finite() || criterion < 0.0)
    {
        errors.push(format!("{path}: criterion must be a non-negative number"));
    }
    if let Some(run_if) = &block.run_if {
        check_run_if(script, run_if, &path, errors);
    }

    let Some(content) = block.content() else {
        errors.push(format!(
            "{path}: block must have exactly one of blocks, pages, groups"
        ));
        return;
    };

    match content {
        BlockContent::Blocks(children) => {
            if block.latin_square || block.pseudorandom {
                errors.push(format!(
                    "{path}: latinSquare and pseudorandom apply only to blocks of pages"
                ));
            }
            let ids: Vec<&str> = children.iter().map(|b| b.id.as_str()).collect();
            check_siblings(&path.to_string(), &ids, errors);
            check_ordering_sets(
                &path.to_string(),
                &ids,
                &block.exchangeable,
                &block.counterbalance,
                errors,
            );
            for child in children {
                validate_block(script, child, &path, errors);
            }
        }
        BlockContent::Pages(_) | BlockContent::Groups(_) => {
            if !block.exchangeable.is_empty() || !block.counterbalance.is_empty() {
                errors.push(format!(
                    "{path}: exchangeable and counterbalance apply only to blocks of blocks"
                ));
            }
            let pages = block.declared_pages();
            let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
            check_siblings(&path.to_string(), &ids, errors);
            check_page_ordering(block, content, &path, errors);
        }
    }
}

fn check_page_ordering(
    block: &BlockSpec,
    content: BlockContent<'_>,
    path: &UnitPath,
    errors: &mut Vec<String>,
) {
    if let BlockContent::Groups(groups) = content {
        if block.latin_square {
            let sizes: HashSet<usize> = groups.iter().map(Vec::len).collect();
            if sizes.len() > 1 {
                errors.push(format!(
                    "{path}: can't do Latin square on groups of uneven sizes"
                ));
            }
        }
        if groups.iter().any(Vec::is_empty) {
            errors.push(format!("{path}: groups must not be empty"));
        }
    } else if block.latin_square {
        errors.push(format!("{path}: latinSquare requires groups"));
    }

    if !block.pseudorandom {
        return;
    }
    let pages = block.declared_pages();
    if pages.iter().any(|p| p.condition.is_none()) {
        errors.push(format!(
            "{path}: can't pseudorandomize pages without conditions"
        ));
        return;
    }
    if let BlockContent::Groups(_) = content {
        if !block.latin_square {
            errors.push(format!(
                "{path}: can't choose pages from groups randomly and ensure pseudorandomization \
                 will work; supply pages, set latinSquare, or unset pseudorandom"
            ));
        }
        let mut counts: BTreeMap<&ConditionTag, usize> = BTreeMap::new();
        for page in &pages {
            if let Some(condition) = &page.condition {
                *counts.entry(condition).or_default() += 1;
            }
        }
        let distinct: HashSet<usize> = counts.values().copied().collect();
        if distinct.len() > 1 {
            errors.push(format!(
                "{path}: can't pseudorandomize pages if not all conditions are represented \
                 the same number of times"
            ));
        }
    }
}

fn check_run_if(script: &Script, run_if: &RunIfSpec, path: &UnitPath, errors: &mut Vec<String>) {
    let page_id = match run_if {
        RunIfSpec::Selected { page_id, .. } => page_id,
        RunIfSpec::Matched { page_id, regex } => {
            if let Err(err) = Regex::new(regex) {
                errors.push(format!("{path}: invalid runIf regex '{regex}': {err}"));
            }
            page_id
        }
        RunIfSpec::Permutation { .. } => return,
    };
    match page_paths(script, page_id).len() {
        1 => {}
        0 => errors.push(format!("{path}: runIf names unknown page '{page_id}'")),
        n => errors.push(format!(
            "{path}: runIf page '{page_id}' is ambiguous ({n} pages share that id)"
        )),
    }
}

fn check_siblings(scope: &str, ids: &[&str], errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for id in ids {
        if id.is_empty() {
            errors.push(format!("{scope}: empty id"));
        } else if id.contains('/') {
            errors.push(format!("{scope}: id '{id}' must not contain '/'"));
        }
        if !seen.insert(*id) {
            errors.push(format!("{scope}: duplicate id '{id}'"));
        }
    }
}

fn check_ordering_sets(
    scope: &str,
    ids: &[&str],
    exchangeable: &[String],
    counterbalance: &[String],
    errors: &mut Vec<String>,
) {
    for (label, set) in [("exchangeable", exchangeable), ("counterbalance", counterbalance)] {
        for id in set {
            if !ids.contains(&id.as_str()) {
                errors.push(format!("{scope}: {label} names unknown block '{id}'"));
            }
        }
    }
    for id in exchangeable {
        if counterbalance.contains(id) {
            errors.push(format!(
                "{scope}: '{id}' cannot be both exchangeable and counterbalanced"
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{branch, grouped_block, page, page_block, tagged_page};

    fn script(blocks: Vec<BlockSpec>) -> Script {
        Script {
            blocks,
            ..Script::default()
        }
    }

    #[test]
    fn well_formed_script_has_no_errors() {
        let mut outer = branch(
            "outer",
            vec![
                page_block("a", vec![page("a1")]),
                page_block("b", vec![page("b1")]),
            ],
        );
        outer.exchangeable = vec!["a".to_string(), "b".to_string()];
        let mut followup = page_block("followup", vec![page("f1")]);
        followup.run_if = Some(RunIfSpec::Selected {
            page_id: "a1".to_string(),
            option_id: "yes".to_string(),
        });
        assert!(validate_invariants(&script(vec![outer, followup])).is_empty());
    }

    #[test]
    fn reports_structural_errors_together() {
        let mut mixed = page_block("mixed", vec![page("p")]);
        mixed.blocks = Some(Vec::new());
        let mut zero = page_block("zero", vec![page("dup"), page("dup")]);
        zero.cutoff = 0;
        zero.criterion = Some(-1.0);
        let mut root = script(vec![mixed, zero]);
        root.exchangeable = vec!["zero".to_string(), "nope".to_string()];
        root.counterbalance = vec!["zero".to_string()];

        let errors = validate_invariants(&root);
        assert!(errors.iter().any(|e| e.contains("exactly one of")));
        assert!(errors.iter().any(|e| e.contains("duplicate id 'dup'")));
        assert!(errors.iter().any(|e| e.contains("cutoff must be > 0")));
        assert!(errors.iter().any(|e| e.contains("criterion")));
        assert!(errors.iter().any(|e| e.contains("unknown block 'nope'")));
        assert!(errors.iter().any(|e| e.contains("both exchangeable")));
    }

    #[test]
    fn pseudorandom_requires_conditions_and_balance() {
        let mut untagged = page_block("untagged", vec![tagged_page("p1", "a"), page("p2")]);
        untagged.pseudorandom = true;

        let mut unbalanced = grouped_block(
            "unbalanced",
            vec![
                vec![tagged_page("g1a", "a"), tagged_page("g1b", "b")],
                vec![tagged_page("g2a", "a"), tagged_page("g2b", "a")],
            ],
        );
        unbalanced.pseudorandom = true;

        let errors = validate_invariants(&script(vec![untagged, unbalanced]));
        assert!(errors.iter().any(|e| e.contains("without conditions")));
        assert!(errors.iter().any(|e| e.contains("set latinSquare")));
        assert!(errors.iter().any(|e| e.contains("same number of times")));
    }

    #[test]
    fn latin_square_needs_even_groups() {
        let mut uneven = grouped_block(
            "uneven",
            vec![vec![page("a"), page("b")], vec![page("c")]],
        );
        uneven.latin_square = true;
        let mut flat = page_block("flat", vec![page("p")]);
        flat.latin_square = true;

        let errors = validate_invariants(&script(vec![uneven, flat]));
        assert!(errors.iter().any(|e| e.contains("uneven sizes")));
        assert!(errors.iter().any(|e| e.contains("latinSquare requires groups")));
    }

    #[test]
    fn run_if_targets_must_resolve_uniquely() {
        let mut gated = page_block("gated", vec![page("g")]);
        gated.run_if = Some(RunIfSpec::Matched {
            page_id: "shared".to_string(),
            regex: "[".to_string(),
        });
        let mut missing = page_block("missing", vec![page("m")]);
        missing.run_if = Some(RunIfSpec::Selected {
            page_id: "ghost".to_string(),
            option_id: "x".to_string(),
        });
        let blocks = vec![
            page_block("one", vec![page("shared")]),
            page_block("two", vec![page("shared")]),
            gated,
            missing,
        ];

        let errors = validate_invariants(&script(blocks));
        assert!(errors.iter().any(|e| e.contains("invalid runIf regex")));
        assert!(errors.iter().any(|e| e.contains("ambiguous")));
        assert!(errors.iter().any(|e| e.contains("unknown page 'ghost'")));
    }
}
