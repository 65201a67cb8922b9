//! End-to-end pipeline scenarios against a temp working directory.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use ruleforge::config::Config;
use ruleforge::error::ForgeError;
use ruleforge::integrity::Component;
use ruleforge::pipeline;

const METADATA: &str = "\
COPYRIGHT=Example Corp
LICENSE=MIT
SHARING=TLP:CLEAR
VERSION=1.0
AUTHOR=F. Mohammaditabar
CATEGORY=attack-surface-reduction
REFERENCE=https://example.invalid/asr
SEVERITY=high
SOURCE=asr_rules.csv
TAG1=windows
TAG2=process
STATUS=experimental
CREATED=2024-03-01
MODIFIED=2024-03-02
";

const TABLE: &str = "\
id,asr_rule,metadata_comment,metadata_tactic
mimikatz.exe,Credential theft tool,observed in campaign X,T1003
procdump64.exe,LSASS dumper,seen with cobalt strike,T1003
";

fn workspace(table: &str) -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("asr_rules.csv");
    let metadata = dir.path().join("rule_metadata.conf");
    fs::write(&input, table).unwrap();
    fs::write(&metadata, METADATA).unwrap();

    let config = Config {
        input,
        metadata,
        output_dir: dir.path().to_path_buf(),
        target: None,
        scanners: vec![],
    };
    pipeline::seal(&config).unwrap();
    (dir, config)
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

#[test]
fn full_run_produces_all_four_documents() {
    let (dir, config) = workspace(TABLE);
    let report = pipeline::execute(&config).unwrap();

    assert_eq!(report.records, 2);
    assert!(report.row_warnings.is_empty());
    assert_eq!(report.artifacts.len(), 3);
    assert!(report.artifacts.iter().all(|a| a.error.is_none()));

    for name in [
        "asr_rules_gitleaks_rules.toml",
        "asr_rules_yara_rules.yara",
        "asr_rules_ripgrep_patterns.txt",
        "asr_rules_metadata.txt",
    ] {
        assert!(dir.path().join(name).exists(), "missing {name}");
    }
}

#[test]
fn artifacts_carry_the_expected_rule_identifiers() {
    let (dir, config) = workspace(TABLE);
    pipeline::execute(&config).unwrap();

    let yara = read(dir.path(), "asr_rules_yara_rules.yara");
    assert!(yara.contains("rule windows_process_mimikatz_exe"));
    assert!(yara.contains("$id = \"mimikatz.exe\""));

    let gitleaks = read(dir.path(), "asr_rules_gitleaks_rules.toml");
    assert!(gitleaks.contains("id = \"windows_process_mimikatz.exe\""));

    let patterns = read(dir.path(), "asr_rules_ripgrep_patterns.txt");
    assert_eq!(patterns, "mimikatz.exe\nprocdump64.exe\n");
}

#[test]
fn written_artifacts_are_already_preamble_free() {
    let (dir, config) = workspace(TABLE);
    pipeline::execute(&config).unwrap();

    // Post-processed files must start at rule syntax, not boilerplate.
    let gitleaks = read(dir.path(), "asr_rules_gitleaks_rules.toml");
    assert!(gitleaks.starts_with("[[rules]]"));

    let yara = read(dir.path(), "asr_rules_yara_rules.yara");
    assert!(yara.starts_with("rule "));

    // The pre-strip backup retains the provenance header.
    let backup = read(dir.path(), "asr_rules_yara_rules.yara.bak");
    assert!(backup.starts_with("/*"));
    assert!(backup.contains("AUTHOR: F. Mohammaditabar"));
}

#[test]
fn header_only_table_still_writes_empty_artifacts() {
    let (dir, config) = workspace("id,asr_rule,metadata_comment,metadata_tactic\n");
    let report = pipeline::execute(&config).unwrap();

    assert_eq!(report.records, 0);
    assert_eq!(read(dir.path(), "asr_rules_gitleaks_rules.toml"), "");
    assert_eq!(read(dir.path(), "asr_rules_yara_rules.yara"), "");
    assert_eq!(read(dir.path(), "asr_rules_ripgrep_patterns.txt"), "");
    assert!(read(dir.path(), "asr_rules_metadata.txt").contains("TAG1: windows"));
}

#[test]
fn repeated_runs_are_byte_identical() {
    let (dir, config) = workspace(TABLE);
    pipeline::execute(&config).unwrap();
    let first = [
        read(dir.path(), "asr_rules_gitleaks_rules.toml"),
        read(dir.path(), "asr_rules_yara_rules.yara"),
        read(dir.path(), "asr_rules_ripgrep_patterns.txt"),
    ];

    pipeline::execute(&config).unwrap();
    let second = [
        read(dir.path(), "asr_rules_gitleaks_rules.toml"),
        read(dir.path(), "asr_rules_yara_rules.yara"),
        read(dir.path(), "asr_rules_ripgrep_patterns.txt"),
    ];

    assert_eq!(first, second);
}

#[test]
fn tampered_table_aborts_before_any_artifact_is_written() {
    let (dir, config) = workspace(TABLE);

    // Mutate one byte after sealing.
    let mut content = fs::read(&config.input).unwrap();
    let last = content.len() - 1;
    content[last] ^= 1;
    fs::write(&config.input, content).unwrap();

    let err = pipeline::execute(&config).unwrap_err();
    assert!(matches!(err, ForgeError::Integrity { .. }));
    assert!(!dir.path().join("asr_rules_yara_rules.yara").exists());
}

#[cfg(unix)]
#[test]
fn wrong_metadata_mode_aborts_the_run() {
    use std::os::unix::fs::PermissionsExt;

    let (dir, config) = workspace(TABLE);
    fs::set_permissions(&config.metadata, fs::Permissions::from_mode(0o600)).unwrap();

    let err = pipeline::execute(&config).unwrap_err();
    assert!(matches!(err, ForgeError::Integrity { .. }));
    assert!(!dir.path().join("asr_rules_gitleaks_rules.toml").exists());
}

#[test]
fn partially_bound_metadata_fails_closed() {
    let (dir, config) = workspace(TABLE);
    fs::write(&config.metadata, METADATA.replace("SEVERITY=high\n", "")).unwrap();
    Component::new(&config.metadata).seal().unwrap();

    let err = pipeline::execute(&config).unwrap_err();
    assert!(matches!(err, ForgeError::Config(_)));
    assert!(!dir.path().join("asr_rules_metadata.txt").exists());
}

#[test]
fn malformed_rows_are_skipped_and_reported() {
    let table = "\
id,asr_rule,metadata_comment,metadata_tactic
,description without an id,note,T1000
valid.exe,desc,note,T1001
";
    let (dir, config) = workspace(table);
    let report = pipeline::execute(&config).unwrap();

    assert_eq!(report.records, 1);
    assert_eq!(report.row_warnings.len(), 1);
    assert_eq!(report.row_warnings[0].line, 2);

    let patterns = read(dir.path(), "asr_rules_ripgrep_patterns.txt");
    assert_eq!(patterns, "valid.exe\n");
}

#[test]
fn missing_scanner_binaries_do_not_fail_the_run() {
    let (dir, mut config) = workspace(TABLE);
    let target = dir.path().join("sample.bin");
    fs::write(&target, "this sample mentions mimikatz.exe somewhere\n").unwrap();
    config.target = Some(target);
    config.scanners = vec![
        ruleforge::scanner::ScannerKind::Gitleaks,
        ruleforge::scanner::ScannerKind::Yara,
        ruleforge::scanner::ScannerKind::Ripgrep,
    ];

    // Whatever subset of the scanners is installed on this machine,
    // the run itself must succeed and leave one dated log per scanner
    // that got as far as invocation.
    let report = pipeline::execute(&config).unwrap();
    assert_eq!(report.scans.len(), 3);
    for scan in &report.scans {
        assert!(scan.error.is_none(), "{:?}", scan);
        let log = scan.log_path.as_ref().expect("log path");
        assert!(Path::new(log).exists());
    }
}

#[test]
fn duplicate_records_produce_duplicate_rules() {
    let table = "\
id,asr_rule,metadata_comment,metadata_tactic
dup.exe,first,one,T1
dup.exe,second,two,T2
";
    let (dir, config) = workspace(table);
    pipeline::execute(&config).unwrap();

    let yara = read(dir.path(), "asr_rules_yara_rules.yara");
    assert_eq!(yara.matches("rule windows_process_dup_exe").count(), 2);
}
