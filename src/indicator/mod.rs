//! Indicator table input: one CSV row per detection token.
//!
//! The table format is deliberately lax — comma-split with no quoting
//! support — matching the upstream feeds this tool consumes. Rows
//! without an id are skipped with a warning rather than silently
//! compiled into broken rules.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// One canonical input row. Immutable once parsed; consumed once per
/// compilation pass. Duplicate ids are legal and produce duplicate
/// rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRecord {
    /// The detection token (filename, string, hash). Never empty.
    pub id: String,
    pub rule_description: String,
    pub comment: String,
    pub tactic: String,
}

/// A skipped row, surfaced in the run report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RowWarning {
    /// 1-based line number in the source table.
    pub line: usize,
    pub reason: String,
}

/// Parse an indicator table. The first line is a header and is always
/// skipped. Record order is preserved exactly.
pub fn parse_table(content: &str) -> (Vec<IndicatorRecord>, Vec<RowWarning>) {
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for (idx, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let mut fields: Vec<&str> = line.split(',').collect();
        // Extra columns fold back into the tactic field so nothing is
        // silently dropped.
        if fields.len() > 4 {
            let tail = fields.split_off(3).join(",");
            let record = build_record(&fields, Some(tail));
            push_checked(record, idx + 1, &mut records, &mut warnings);
            continue;
        }

        let record = build_record(&fields, None);
        push_checked(record, idx + 1, &mut records, &mut warnings);
    }

    (records, warnings)
}

/// Read and parse a table file.
pub fn load_table(path: &Path) -> Result<(Vec<IndicatorRecord>, Vec<RowWarning>)> {
    let content = fs::read_to_string(path)?;
    Ok(parse_table(&content))
}

fn build_record(fields: &[&str], tactic_override: Option<String>) -> IndicatorRecord {
    let field = |i: usize| fields.get(i).map(|s| s.trim()).unwrap_or("").to_string();
    IndicatorRecord {
        id: field(0),
        rule_description: field(1),
        comment: field(2),
        tactic: tactic_override.unwrap_or_else(|| field(3)),
    }
}

fn push_checked(
    record: IndicatorRecord,
    line: usize,
    records: &mut Vec<IndicatorRecord>,
    warnings: &mut Vec<RowWarning>,
) {
    if record.id.is_empty() {
        tracing::warn!(line, "skipping row with empty indicator id");
        warnings.push(RowWarning {
            line,
            reason: "empty indicator id".into(),
        });
        return;
    }
    records.push(record);
}
