//! Pattern-list emitter (ripgrep `-f` multi-pattern file).
//!
//! The barest of the three formats: one raw indicator per line, no
//! metadata, no escaping, no preamble.

use super::{ArtifactFormat, Emitter};
use crate::indicator::IndicatorRecord;
use crate::metadata::MetadataContext;

pub struct RipgrepEmitter;

impl Emitter for RipgrepEmitter {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::PatternList
    }

    fn header(&self, _metadata: &MetadataContext) -> String {
        String::new()
    }

    fn emit_rule(&self, record: &IndicatorRecord, _metadata: &MetadataContext) -> String {
        format!("{}\n", record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_support::{sample_metadata, sample_record};
    use pretty_assertions::assert_eq;

    #[test]
    fn one_raw_pattern_per_line() {
        let line = RipgrepEmitter.emit_rule(&sample_record(), &sample_metadata());
        assert_eq!(line, "mimikatz.exe\n");
    }

    #[test]
    fn no_preamble() {
        assert!(RipgrepEmitter.header(&sample_metadata()).is_empty());
    }
}
