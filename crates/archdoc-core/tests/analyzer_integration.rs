//! Integration test: annotated workspace end-to-end via Analyzer.
//!
//! The fixture under `tests/fixtures/shop/` has two containers: `api` with
//! four components and `worker` with one, plus a configured
//! container-to-container relation.

use archdoc_core::groups::UNGROUPED;
use archdoc_core::{
    codes, Analyzer, AnalyzerError, Classification, ContainerModel, UsageKind, ValidationResult,
    WorkspaceConfig, WorkspaceModel,
};
use std::fs;
use std::path::{Path, PathBuf};

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/shop")
}

fn analyze_fixture() -> WorkspaceModel {
    let root = fixture_root();
    let config = WorkspaceConfig::from_file(&root.join("archdoc.toml"), "shop")
        .expect("fixture config should load");
    Analyzer::builder()
        .root(&root)
        .config(config)
        .build()
        .expect("analyzer should build")
        .analyze()
        .expect("analysis should succeed")
}

fn container<'m>(model: &'m WorkspaceModel, name: &str) -> &'m ContainerModel {
    model
        .containers
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("missing container {name}"))
}

fn result<'m>(container: &'m ContainerModel, source: &str, target: &str) -> &'m ValidationResult {
    container
        .validation
        .iter()
        .find(|r| r.source == source && r.target == target)
        .unwrap_or_else(|| panic!("missing result {source} -> {target}"))
}

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

// ── Fixture workspace ──

#[test]
fn containers_keep_configuration_order() {
    let model = analyze_fixture();
    assert_eq!(model.name, "Shop");
    let names: Vec<&str> = model.containers.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["api", "worker"]);

    let api = container(&model, "api");
    assert_eq!(api.files_checked, 5);
    assert!(api.findings.is_empty(), "unexpected findings: {:#?}", api.findings);
    let mut components: Vec<&str> = api.components.iter().map(|c| c.name.as_str()).collect();
    components.sort_unstable();
    assert_eq!(components, vec!["Ledger", "Mailer", "OrderService", "PaymentService"]);
}

#[test]
fn constructor_injection_conflicts_with_indirect_tag() {
    let model = analyze_fixture();
    let api = container(&model, "api");

    let kinds: Vec<UsageKind> = api
        .evidence
        .iter()
        .filter(|e| e.source == "OrderService" && e.target == "PaymentService")
        .map(|e| e.kind)
        .collect();
    assert!(kinds.contains(&UsageKind::Constructor));
    assert!(kinds.contains(&UsageKind::Field));

    let payments = result(api, "OrderService", "PaymentService");
    assert!(payments.target_exists && payments.is_used);
    assert_eq!(payments.classification, Some(Classification::Direct));
    assert_eq!(payments.errors.len(), 1, "{:#?}", payments.errors);
    assert!(payments.errors[0].contains("IndirectRelation"));
    assert!(payments.errors[0].contains("orders.rs"));
}

#[test]
fn untagged_relation_receives_inferred_tag() {
    let model = analyze_fixture();
    let api = container(&model, "api");

    let mailer = result(api, "OrderService", "Mailer");
    assert!(!mailer.is_problem());
    assert_eq!(mailer.classification, Some(Classification::Indirect));
    assert_eq!(mailer.inferred_tag.as_deref(), Some("IndirectRelation"));

    let orders = api
        .components
        .iter()
        .find(|c| c.name == "OrderService")
        .unwrap();
    let declared = orders.relations.iter().find(|r| r.target == "Mailer").unwrap();
    assert_eq!(declared.tags, vec!["IndirectRelation"]);
    assert_eq!(orders.relations.len(), 5);
}

#[test]
fn external_and_cross_scope_targets_are_trusted() {
    let model = analyze_fixture();
    let api = container(&model, "api");

    let metrics = result(api, "OrderService", "metrics-service");
    assert!(metrics.target_exists && metrics.is_used);
    assert!(metrics.errors.is_empty());
    assert_eq!(metrics.usage_location, None);

    let queue = result(api, "OrderService", "worker.JobQueue");
    assert!(!queue.is_problem(), "{queue:#?}");

    let container_target = result(api, "OrderService", "worker");
    assert!(!container_target.is_problem(), "{container_target:#?}");
    assert_eq!(container_target.usage_location, None);
}

#[test]
fn field_usage_without_declaration_is_reported() {
    let model = analyze_fixture();
    let api = container(&model, "api");

    let undeclared: Vec<&ValidationResult> = api.validation.iter().filter(|r| r.synthetic).collect();
    assert_eq!(undeclared.len(), 1, "{undeclared:#?}");
    assert_eq!(undeclared[0].source, "PaymentService");
    assert_eq!(undeclared[0].target, "Ledger");
    assert!(undeclared[0].errors[0].contains("undeclared"));
    assert!(undeclared[0].relation_index.is_none());
}

#[test]
fn call_chain_runs_from_the_calling_component() {
    let model = analyze_fixture();
    let api = container(&model, "api");

    let chains: Vec<&[String]> = api
        .evidence
        .iter()
        .filter(|e| e.source == "PaymentService" && e.target == "Ledger")
        .filter(|e| e.kind == UsageKind::MethodCall)
        .map(|e| e.call_chain.as_slice())
        .collect();
    let expected = ["OrderService.place", "PaymentService.charge", "Ledger.record"];
    assert!(chains.iter().any(|c| *c == expected), "{chains:#?}");
    assert!(chains.iter().any(|c| c.len() == 2));
}

#[test]
fn group_tree_attaches_components_at_leaves() {
    let model = analyze_fixture();
    let api = container(&model, "api");

    assert_eq!(api.groups[0].name, UNGROUPED);
    let mut ungrouped = api.groups[0].components.clone();
    ungrouped.sort();
    assert_eq!(ungrouped, vec!["Ledger", "Mailer"]);

    let business = api.groups.iter().find(|g| g.name == "Business").unwrap();
    assert!(business.components.is_empty());
    let processing = business
        .subgroups
        .iter()
        .find(|g| g.name == "Payment Processing")
        .unwrap();
    assert_eq!(processing.path, "Business/Payment Processing");
    assert_eq!(processing.components, vec!["PaymentService"]);
}

#[test]
fn workspace_relations_are_checked_by_name() {
    let model = analyze_fixture();
    assert_eq!(model.relations.len(), 1);
    assert!(!model.relations[0].is_problem());
    assert!(model.has_problems());
}

#[test]
fn model_serializes_to_json() {
    let model = analyze_fixture();
    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(json["containers"][0]["name"], "api");
    assert!(json["containers"][1]["validation"].as_array().unwrap().is_empty());
}

// ── Temporary workspaces ──

#[test]
fn unknown_cross_scope_target_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "archdoc.toml",
        "[[containers]]\nname = \"api\"\n[[containers]]\nname = \"worker\"\nroot = \"worker\"\n",
    );
    write(
        dir.path(),
        "src/lib.rs",
        "/// @component\n/// @relation worker.Missing | Schedules\npub struct Orders;",
    );
    write(dir.path(), "worker/src/lib.rs", "/// @component\npub struct Queue;");

    let config = WorkspaceConfig::from_file(&dir.path().join("archdoc.toml"), "shop").unwrap();
    let model = Analyzer::builder()
        .root(dir.path())
        .config(config)
        .build()
        .unwrap()
        .analyze()
        .unwrap();
    let api = container(&model, "api");
    let missing = result(api, "Orders", "worker.Missing");
    assert!(!missing.target_exists);
    assert!(missing.errors[0].contains("worker.Missing"));
}

#[test]
fn parse_errors_are_findings_and_other_files_still_count() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/lib.rs", "/// @component\npub struct Ledger;");
    write(dir.path(), "src/broken.rs", "fn (");

    let model = Analyzer::builder()
        .root(dir.path())
        .build()
        .unwrap()
        .analyze()
        .unwrap();
    let only = &model.containers[0];
    assert_eq!(only.files_checked, 1);
    assert_eq!(only.components.len(), 1);
    assert_eq!(only.findings.len(), 1);
    assert_eq!(only.findings[0].code, codes::PARSE_ERROR.0);
}

#[test]
fn duplicate_components_are_dropped_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/a.rs", "/// @component Ledger\npub struct A;");
    write(dir.path(), "src/b.rs", "/// @component Ledger\npub struct B;");

    let model = Analyzer::builder()
        .root(dir.path())
        .build()
        .unwrap()
        .analyze()
        .unwrap();
    let only = &model.containers[0];
    assert_eq!(only.components.len(), 1);
    assert!(only.components[0].declaration.ends_with("::a::A"));
    assert!(only.findings.iter().any(|f| f.code == codes::DUPLICATE_COMPONENT.0));
}

#[test]
fn strict_mode_stops_at_first_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/lib.rs", "/// @relation OnlyTarget\npub struct Ledger;");

    let lenient = Analyzer::builder()
        .root(dir.path())
        .build()
        .unwrap()
        .analyze()
        .unwrap();
    assert_eq!(lenient.containers[0].findings[0].code, codes::TAG_GRAMMAR.0);

    let err = Analyzer::builder()
        .root(dir.path())
        .strict(true)
        .build()
        .unwrap()
        .analyze()
        .unwrap_err();
    match err {
        AnalyzerError::Strict { finding, .. } => assert_eq!(finding.code, codes::TAG_GRAMMAR.0),
        other => panic!("expected strict error, got {other}"),
    }
}

#[test]
fn cli_excludes_apply_to_every_container() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/lib.rs", "/// @component\npub struct Ledger;");
    write(dir.path(), "src/generated/schema.rs", "/// @component\npub struct Schema;");

    let model = Analyzer::builder()
        .root(dir.path())
        .exclude("**/generated/**")
        .build()
        .unwrap()
        .analyze()
        .unwrap();
    assert_eq!(model.containers[0].files_checked, 1);
    assert_eq!(model.containers[0].components[0].name, "Ledger");
}
