//! Secret-scan rule emitter (Gitleaks TOML, array-of-tables).

use super::{ArtifactFormat, Emitter};
use crate::indicator::IndicatorRecord;
use crate::metadata::MetadataContext;

pub struct GitleaksEmitter;

impl Emitter for GitleaksEmitter {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::SecretScanRules
    }

    fn header(&self, metadata: &MetadataContext) -> String {
        let mut out = String::new();
        out.push_str("# Gitleaks rules generated from an indicator table.\n");
        out.push_str("# This header is stripped before the file is handed to the scanner.\n");
        out.push_str("#\n");
        for (key, value) in metadata.fields() {
            out.push_str(&format!("# {key}: {value}\n"));
        }
        out.push_str("#\n");
        out.push_str("# One [[rules]] block per indicator, input order preserved.\n");
        out.push('\n');
        out
    }

    fn emit_rule(&self, record: &IndicatorRecord, metadata: &MetadataContext) -> String {
        // The rule id keeps the raw indicator for fidelity with the
        // upstream feed; only string contents are escaped so the TOML
        // stays parseable. Quotes warrant an operator heads-up.
        let id = format!("{}_{}_{}", metadata.tag1, metadata.tag2, record.id);
        if record.id.contains('"') {
            tracing::warn!(id = %record.id, "indicator contains a quote; gitleaks rule id may be awkward to reference");
        }

        let description = [
            record.rule_description.as_str(),
            record.comment.as_str(),
            record.tactic.as_str(),
        ]
        .join(" ");

        let tags: Vec<String> = metadata
            .fields()
            .iter()
            .map(|(key, value)| {
                format!("\"{}\"", toml_escape(&format!("{}: {}", title_case(key), value)))
            })
            .collect();

        let mut out = String::new();
        out.push_str("[[rules]]\n");
        out.push_str(&format!("id = \"{}\"\n", toml_escape(&id)));
        out.push_str(&format!("description = \"{}\"\n", toml_escape(&description)));
        out.push_str(&format!("regex = \"{}\"\n", toml_escape(&regex::escape(&record.id))));
        out.push_str(&format!("keywords = [\"{}\"]\n", toml_escape(&record.id)));
        out.push_str(&format!("tags = [{}]\n", tags.join(", ")));
        out.push('\n');
        out
    }
}

/// Escape a value for a TOML basic (double-quoted) string.
fn toml_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `TAG1` -> `Tag1`, `VERSION` -> `Version` — the annotation style the
/// tag list uses.
fn title_case(key: &str) -> String {
    let lower = key.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_support::{sample_metadata, sample_record};
    use pretty_assertions::assert_eq;

    #[test]
    fn rule_id_is_unsanitized_tag_prefix() {
        let rule = GitleaksEmitter.emit_rule(&sample_record(), &sample_metadata());
        assert!(rule.contains("id = \"windows_process_mimikatz.exe\""));
    }

    #[test]
    fn regex_field_escapes_metacharacters() {
        let rule = GitleaksEmitter.emit_rule(&sample_record(), &sample_metadata());
        assert!(rule.contains("regex = \"mimikatz\\\\.exe\""));
    }

    #[test]
    fn keywords_hold_the_literal_indicator() {
        let rule = GitleaksEmitter.emit_rule(&sample_record(), &sample_metadata());
        assert!(rule.contains("keywords = [\"mimikatz.exe\"]"));
    }

    #[test]
    fn tags_carry_every_metadata_field() {
        let metadata = sample_metadata();
        let rule = GitleaksEmitter.emit_rule(&sample_record(), &metadata);
        assert!(rule.contains("\"Version: 1.0\""));
        assert!(rule.contains("\"Category: attack-surface-reduction\""));
        for (key, _) in metadata.fields() {
            assert!(
                rule.contains(&format!("{}: ", title_case(key))),
                "tags missing {key}"
            );
        }
    }

    #[test]
    fn description_concatenates_row_fields() {
        let rule = GitleaksEmitter.emit_rule(&sample_record(), &sample_metadata());
        assert!(rule.contains(
            "description = \"Credential theft tool observed in campaign X T1003\""
        ));
    }

    #[test]
    fn header_is_all_toml_comments_or_blank() {
        let header = GitleaksEmitter.header(&sample_metadata());
        for line in header.lines() {
            assert!(line.is_empty() || line.starts_with('#'), "bad line: {line}");
        }
    }

    #[test]
    fn quoted_indicator_stays_parseable() {
        let mut record = sample_record();
        record.id = "evil\"name".into();
        let rule = GitleaksEmitter.emit_rule(&record, &sample_metadata());
        assert!(rule.contains("keywords = [\"evil\\\"name\"]"));
    }

    #[test]
    fn title_case_examples() {
        assert_eq!(title_case("VERSION"), "Version");
        assert_eq!(title_case("TAG1"), "Tag1");
    }
}
