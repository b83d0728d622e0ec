//! Script loading with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;

use crate::core::invariants::validate_invariants;
use crate::core::types::ScriptConfigurationError;
use crate::script::Script;

/// JSON Schema every script must satisfy before semantic checks run.
pub const SCRIPT_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/script.schema.json"
));

/// Read and validate a script file.
pub fn load_script(path: &Path) -> Result<Script> {
    let raw = fs::read_to_string(path).with_context(|| format!("read script {}", path.display()))?;
    parse_script(&raw).with_context(|| format!("load script {}", path.display()))
}

/// Parse and validate a script: schema conformance, then semantic invariants.
///
/// Schema, shape and invariant failures are returned as a
/// [`ScriptConfigurationError`] so callers can tell them apart from I/O and
/// JSON syntax problems.
pub fn parse_script(raw: &str) -> Result<Script> {
    let value: Value = serde_json::from_str(raw).context("parse script json")?;
    validate_schema(&value)?;
    let script: Script = serde_json::from_value(value)
        .map_err(|err| ScriptConfigurationError::new(format!("deserialize script: {err}")))?;
    let errors = validate_invariants(&script);
    if !errors.is_empty() {
        return Err(ScriptConfigurationError::new(errors.join("; ")).into());
    }
    Ok(script)
}

fn validate_schema(script: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(SCRIPT_SCHEMA).context("parse embedded schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    let messages: Vec<String> = compiled
        .iter_errors(script)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(ScriptConfigurationError::new(format!(
            "schema validation failed: {}",
            messages.join("; ")
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ConditionTag;
    use crate::script::RunIfSpec;
    use crate::test_support::{TestDir, page, page_block};

    fn config_cause(err: &anyhow::Error) -> String {
        err.downcast_ref::<ScriptConfigurationError>()
            .map(|err| err.cause.clone())
            .unwrap_or_else(|| panic!("expected configuration error, got {err:#}"))
    }

    #[test]
    fn parses_camel_case_script() {
        let script = parse_script(
            r#"{
                "exchangeable": ["a", "b"],
                "blocks": [
                    {"id": "a", "pages": [
                        {"id": "q", "text": "Ready?", "options": [{"id": "yes"}]}
                    ]},
                    {"id": "b", "runIf": {"pageID": "q", "optionID": "yes"},
                     "criterion": 0.75, "cutoff": 4,
                     "groups": [[{"id": "g1", "condition": 1}], [{"id": "g2", "condition": 2}]],
                     "latinSquare": true}
                ]
            }"#,
        )
        .expect("parse");

        assert_eq!(script.exchangeable, vec!["a", "b"]);
        let gated = &script.blocks[1];
        assert_eq!(gated.cutoff, 4);
        assert_eq!(gated.criterion, Some(0.75));
        assert!(gated.latin_square);
        assert_eq!(
            gated.run_if,
            Some(RunIfSpec::Selected {
                page_id: "q".to_string(),
                option_id: "yes".to_string(),
            })
        );
        let groups = gated.groups.as_ref().expect("groups");
        assert_eq!(groups[1][0].condition, Some(ConditionTag::Number(2)));
        let q = &script.blocks[0].pages.as_ref().expect("pages")[0];
        assert_eq!(q.content.get("text").and_then(Value::as_str), Some("Ready?"));
    }

    #[test]
    fn schema_rejects_unknown_block_keys() {
        let err = parse_script(r#"{"blocks": [{"id": "a", "pages": [], "shuffle": true}]}"#)
            .expect_err("unknown key");
        assert!(config_cause(&err).contains("schema validation failed"));
    }

    #[test]
    fn invariants_reported_together() {
        let err = parse_script(
            r#"{"blocks": [
                {"id": "a", "pages": [{"id": "p"}, {"id": "p"}]},
                {"id": "b", "pages": [{"id": "x"}], "latinSquare": true}
            ]}"#,
        )
        .expect_err("invalid");
        let cause = config_cause(&err);
        assert!(cause.contains("duplicate id 'p'"), "{cause}");
        assert!(cause.contains("latinSquare"), "{cause}");
    }

    #[test]
    fn out_of_range_numbers_are_configuration_errors() {
        for raw in [
            r#"{"blocks": [{"id": "a", "pages": [{"id": "p"}], "cutoff": 5000000000}]}"#,
            r#"{"blocks": [{"id": "a", "pages": [{"id": "p"}],
                "runIf": {"permutation": [4294967296]}}]}"#,
            r#"{"blocks": [{"id": "a", "pages": [{"id": "p", "condition": 1e19}]}]}"#,
        ] {
            let err = parse_script(raw).expect_err("out of range");
            assert!(!config_cause(&err).is_empty(), "{raw}");
        }
    }

    #[test]
    fn malformed_json_is_not_a_configuration_error() {
        let err = parse_script("{not json").expect_err("bad json");
        assert!(err.downcast_ref::<ScriptConfigurationError>().is_none());
    }

    #[test]
    fn load_script_reads_from_disk() {
        let dir = TestDir::new().expect("dir");
        let script = Script {
            blocks: vec![page_block("only", vec![page("p1")])],
            ..Script::default()
        };
        let path = dir.write_script("script.json", &script).expect("write");
        assert_eq!(load_script(&path).expect("load"), script);

        let err = load_script(&dir.path().join("missing.json")).expect_err("missing");
        assert!(format!("{err:#}").contains("missing.json"));
    }
}
