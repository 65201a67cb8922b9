//! Signature rule emitter (YARA).

use super::{sanitize_identifier, ArtifactFormat, Emitter};
use crate::indicator::IndicatorRecord;
use crate::metadata::MetadataContext;

pub struct YaraEmitter;

/// Rule name: `TAG1_TAG2_<sanitized id>`. Names are not deduplicated —
/// duplicate input ids produce duplicate rule names.
pub fn rule_name(record: &IndicatorRecord, metadata: &MetadataContext) -> String {
    format!(
        "{}_{}_{}",
        metadata.tag1,
        metadata.tag2,
        sanitize_identifier(&record.id)
    )
}

impl Emitter for YaraEmitter {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::SignatureRules
    }

    fn header(&self, metadata: &MetadataContext) -> String {
        let mut out = String::new();
        out.push_str("/*\n");
        out.push_str(" * YARA rules generated from an indicator table.\n");
        out.push_str(" * This header is stripped before the file is handed to the scanner.\n");
        out.push_str(" *\n");
        for (key, value) in metadata.fields() {
            out.push_str(&format!(" * {key}: {value}\n"));
        }
        out.push_str(" *\n");
        out.push_str(" * One rule per indicator, input order preserved.\n");
        out.push_str(" */\n");
        out.push('\n');
        out
    }

    fn emit_rule(&self, record: &IndicatorRecord, metadata: &MetadataContext) -> String {
        let name = rule_name(record, metadata);

        // Double quotes are deleted, not escaped, to keep the generated
        // syntax well-formed. Lossy when an indicator legitimately
        // carries a quote.
        let description = strip_quotes(&format!(
            "{} {} {}",
            record.rule_description, record.comment, record.tactic
        ));

        let mut out = String::new();
        out.push_str(&format!("rule {name}\n"));
        out.push_str("{\n");
        out.push_str("    meta:\n");
        for (key, value) in metadata.fields() {
            out.push_str(&format!(
                "        {} = \"{}\"\n",
                key.to_lowercase(),
                strip_quotes(value)
            ));
        }
        out.push_str(&format!("        description = \"{description}\"\n"));
        out.push_str("    strings:\n");
        out.push_str(&format!("        $id = \"{}\"\n", record.id));
        out.push_str("    condition:\n");
        out.push_str("        $id\n");
        out.push_str("}\n");
        out.push('\n');
        out
    }
}

fn strip_quotes(raw: &str) -> String {
    raw.replace('"', "")
}
