//! Integration tests for driftwatch-verifier

use driftwatch_domain::traits::{ClaimStore, DeepVerifier, MappingStore};
use driftwatch_domain::{
    Claim, ClaimMapping, ClaimPayload, DeepVerdict, DeepVerificationRequest, FileChange,
    MappingId, MappingMethod, RoutingReason, Severity, Testability, Verdict, VerificationPath,
    VerificationResult, VerificationTier,
};
use driftwatch_index::{CodebaseIndex, IndexConfig};
use driftwatch_mapper::{Mapper, MapperConfig};
use driftwatch_store::SqliteStore;
use driftwatch_verifier::{UnavailableDeepVerifier, Verifier, VerifierConfig};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

const REPO: &str = "repo";

const APP_TS: &str = r#"import express from "express";

export interface User {
  id: string;
  name: string;
}

export function getUser(req, res) {
  res.json({ id: req.params.id });
}

export function loadUser(id: string): User {
  const key = process.env.API_KEY;
  return { id, name: key };
}

app.get("/users/:id", getUser);
"#;

const DB_TS: &str = r#"export function connect(url) {
  return url;
}
"#;

const PACKAGE_JSON: &str = r#"{
  "dependencies": { "express": "5.0.0" },
  "scripts": { "build": "tsc", "test": "jest" },
  "engines": { "node": ">=18" }
}"#;

const TSCONFIG: &str = r#"{
  // generated
  "compilerOptions": { "strict": true, "target": "es2022" }
}"#;

const ENV_EXAMPLE: &str = "API_KEY=changeme\nPORT=3000\n";

fn files(entries: &[(&'static str, &'static str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect()
}

fn default_files() -> HashMap<String, String> {
    files(&[
        ("src/app.ts", APP_TS),
        ("src/db.ts", DB_TS),
        ("package.json", PACKAGE_JSON),
        ("tsconfig.json", TSCONFIG),
        (".env.example", ENV_EXAMPLE),
        ("README.md", "# Service"),
    ])
}

fn index_with(
    store: Arc<SqliteStore>,
    files: &HashMap<String, String>,
) -> Arc<CodebaseIndex<SqliteStore>> {
    let index = CodebaseIndex::new(store, IndexConfig::default());
    let mut paths: Vec<&String> = files.keys().collect();
    paths.sort();
    let changes: Vec<FileChange> = paths.into_iter().map(|p| FileChange::added(p.as_str())).collect();
    index
        .update_from_diff(REPO, &changes, &|p: &str| files.get(p).cloned())
        .unwrap();
    Arc::new(index)
}

fn verifier_for<D: DeepVerifier>(
    files: HashMap<String, String>,
    deep: D,
    config: VerifierConfig,
) -> Verifier<SqliteStore, D> {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let index = index_with(store, &files);
    Verifier::new(index, deep, config).with_content(move |p: &str| files.get(p).cloned())
}

fn verifier() -> Verifier<SqliteStore, UnavailableDeepVerifier> {
    verifier_for(default_files(), UnavailableDeepVerifier, VerifierConfig::default())
}

fn claim(text: &str, testability: Testability, payload: ClaimPayload) -> Claim {
    Claim::new(REPO, "README.md", 1, text, testability, payload)
}

fn path_claim(path: &str) -> Claim {
    claim(
        &format!("See `{}` for the server", path),
        Testability::Syntactic,
        ClaimPayload::PathReference { path: path.into() },
    )
}

/// Deep verifier that records requests and answers with a fixed verdict
struct Recorder {
    verdict: Option<DeepVerdict>,
    requests: RefCell<Vec<DeepVerificationRequest>>,
}

impl Recorder {
    fn answering(verdict: DeepVerdict) -> Self {
        Self {
            verdict: Some(verdict),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            verdict: None,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl DeepVerifier for Recorder {
    type Error = String;

    fn verify(&self, request: &DeepVerificationRequest) -> Result<DeepVerdict, Self::Error> {
        self.requests.borrow_mut().push(request.clone());
        self.verdict.clone().ok_or_else(|| "model unavailable".to_string())
    }
}

fn deep_verdict(verdict: Verdict, evidence: &[&str]) -> DeepVerdict {
    DeepVerdict {
        verdict,
        confidence: 0.8,
        severity: (verdict == Verdict::Drifted).then_some(Severity::Medium),
        reasoning: "checked".to_string(),
        specific_mismatch: None,
        suggested_fix: None,
        evidence_files: evidence.iter().map(|s| s.to_string()).collect(),
    }
}

fn entity_mapping<S: driftwatch_domain::traits::IndexStore>(
    index: &CodebaseIndex<S>,
    claim: &Claim,
    name: &str,
    confidence: f64,
) -> ClaimMapping {
    let entity = index.find_symbol(REPO, name).unwrap().remove(0);
    ClaimMapping {
        id: MappingId::new(),
        claim_id: claim.id,
        code_file: entity.file_path,
        code_entity_id: Some(entity.id),
        confidence,
        co_change_boost: 0.0,
        mapping_method: MappingMethod::SymbolSearch,
    }
}

#[test]
fn test_existing_path_is_verified() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let index = index_with(store, &default_files());
    let mapper = Mapper::new(index.clone(), MapperConfig::default());
    let verifier = Verifier::new(index, UnavailableDeepVerifier, VerifierConfig::default());

    let claim = path_claim("src/app.ts");
    let mappings = mapper.map_claim(&claim).unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].confidence, 1.0);

    let result = verifier.verify_claim(&claim, None).unwrap();
    assert_eq!(result.verdict, Verdict::Verified);
    assert_eq!(result.tier, VerificationTier::Deterministic);
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.evidence_files, vec!["src/app.ts".to_string()]);
}

#[test]
fn test_dependency_major_mismatch_is_drift() {
    let verifier = verifier();
    let claim = claim(
        "Built on express 4",
        Testability::Syntactic,
        ClaimPayload::DependencyVersion {
            package: "express".into(),
            version: Some("4".into()),
        },
    );
    let result = verifier.verify_claim(&claim, None).unwrap();
    assert_eq!(result.verdict, Verdict::Drifted);
    assert_eq!(result.severity, Some(Severity::Medium));
    assert!(result.reasoning.contains("5.0.0"));
    assert_eq!(result.suggested_fix.as_deref(), Some("Built on express 5.0.0"));
    assert_eq!(result.evidence_files, vec!["package.json".to_string()]);
}

#[test]
fn test_dependency_without_version_is_verified() {
    let verifier = verifier();
    let claim = claim(
        "Uses express",
        Testability::Syntactic,
        ClaimPayload::DependencyVersion {
            package: "express".into(),
            version: None,
        },
    );
    assert_eq!(verifier.verify_claim(&claim, None).unwrap().verdict, Verdict::Verified);
}

#[test]
fn test_missing_path_suggests_nearest() {
    let mut tree = default_files();
    let app = tree.remove("src/app.ts").unwrap();
    tree.insert("src/ap.ts".to_string(), app);
    let verifier = verifier_for(tree, UnavailableDeepVerifier, VerifierConfig::default());

    let result = verifier.verify_claim(&path_claim("src/app.ts"), None).unwrap();
    assert_eq!(result.verdict, Verdict::Drifted);
    assert_eq!(result.severity, Some(Severity::Medium));
    assert_eq!(result.suggested_fix.as_deref(), Some("See `src/ap.ts` for the server"));
    assert_eq!(result.evidence_files, vec!["src/ap.ts".to_string()]);
}

#[test]
fn test_missing_path_without_suggestion_is_downgraded() {
    let verifier = verifier();
    let result = verifier
        .verify_claim(&path_claim("services/billing/invoice.go"), None)
        .unwrap();
    assert_eq!(result.verdict, Verdict::Uncertain);
    assert_eq!(result.severity, None);
    assert!(result.evidence_files.is_empty());
    assert_eq!(verifier.metrics().downgrades, 1);
}

#[test]
fn test_path_relative_to_doc_directory() {
    let verifier = verifier();
    let mut claim = path_claim("../src/db.ts");
    claim.source_file = "docs/setup.md".into();
    let result = verifier.verify_claim(&claim, None).unwrap();
    assert_eq!(result.verdict, Verdict::Verified);
    assert_eq!(result.evidence_files, vec!["src/db.ts".to_string()]);
}

#[test]
fn test_non_package_manager_command_has_no_tier1_result() {
    let verifier = verifier();
    let claim = claim(
        "Run `make build`",
        Testability::Syntactic,
        ClaimPayload::Command {
            runner: "make".into(),
            script: "build".into(),
        },
    );
    assert!(verifier.verify_deterministic(&claim).unwrap().is_none());
}

#[test]
fn test_command_scripts() {
    let verifier = verifier();
    let command = |script: &str| {
        claim(
            &format!("Run `npm {}`", script),
            Testability::Syntactic,
            ClaimPayload::Command {
                runner: "npm".into(),
                script: script.into(),
            },
        )
    };

    let ok = verifier.verify_deterministic(&command("run build")).unwrap().unwrap();
    assert_eq!(ok.verdict, Verdict::Verified);
    assert_eq!(ok.evidence_files, vec!["package.json".to_string()]);

    let builtin = verifier.verify_deterministic(&command("install")).unwrap().unwrap();
    assert_eq!(builtin.verdict, Verdict::Verified);

    let typo = verifier.verify_deterministic(&command("run biuld")).unwrap().unwrap();
    assert_eq!(typo.verdict, Verdict::Drifted);
    assert_eq!(typo.severity, Some(Severity::High));
    assert_eq!(typo.suggested_fix.as_deref(), Some("Run `npm run build`"));

    let missing = verifier.verify_deterministic(&command("run deploy")).unwrap().unwrap();
    assert_eq!(missing.verdict, Verdict::Drifted);
    assert_eq!(missing.suggested_fix, None);
}

#[test]
fn test_routes() {
    let verifier = verifier();
    let route = |method: &str, path: &str| {
        claim(
            &format!("`{} {}` returns a user", method, path),
            Testability::Syntactic,
            ClaimPayload::ApiRoute {
                method: method.into(),
                path: path.into(),
            },
        )
    };

    let exact = verifier.verify_deterministic(&route("GET", "/users/{userId}")).unwrap().unwrap();
    assert_eq!(exact.verdict, Verdict::Verified);
    assert_eq!(exact.evidence_files, vec!["src/app.ts".to_string()]);

    let near = verifier.verify_deterministic(&route("GET", "/user/:id")).unwrap().unwrap();
    assert_eq!(near.verdict, Verdict::Drifted);
    assert_eq!(near.severity, Some(Severity::Medium));
    assert_eq!(near.suggested_fix.as_deref(), Some("GET /users/:id"));

    let gone = verifier.verify_deterministic(&route("DELETE", "/orders/:id/items")).unwrap().unwrap();
    assert_eq!(gone.verdict, Verdict::Drifted);
    assert_eq!(gone.severity, Some(Severity::High));
}

#[test]
fn test_code_example_references() {
    let verifier = verifier();
    let example = |symbols: &[&str]| {
        claim(
            "```ts ... ```",
            Testability::Syntactic,
            ClaimPayload::CodeExample {
                imports: vec!["express".into(), "node:fs".into(), "./src/db".into()],
                symbols: symbols.iter().map(|s| s.to_string()).collect(),
                language: Some("typescript".into()),
            },
        )
    };

    let ok = verifier.verify_deterministic(&example(&["getUser"])).unwrap().unwrap();
    assert_eq!(ok.verdict, Verdict::Verified);
    assert_eq!(
        ok.evidence_files,
        vec!["package.json".to_string(), "src/app.ts".to_string(), "src/db.ts".to_string()]
    );

    let one_missing = verifier
        .verify_deterministic(&example(&["getUser", "deleteUser"]))
        .unwrap()
        .unwrap();
    assert_eq!(one_missing.verdict, Verdict::Drifted);
    assert_eq!(one_missing.severity, Some(Severity::Medium));
    assert_eq!(one_missing.specific_mismatch.as_deref(), Some("deleteUser"));

    let empty = claim(
        "```ts ```",
        Testability::Syntactic,
        ClaimPayload::CodeExample {
            imports: Vec::new(),
            symbols: Vec::new(),
            language: None,
        },
    );
    assert!(verifier.verify_deterministic(&empty).unwrap().is_none());
}

#[test]
fn test_pattern_checks() {
    let verifier = verifier();

    let strict = claim(
        "TypeScript strict mode is enabled",
        Testability::Semantic,
        ClaimPayload::Config { setting: None, value: None },
    );
    let result = verifier.verify_claim(&strict, None).unwrap();
    assert_eq!(result.verdict, Verdict::Verified);
    assert_eq!(result.tier, VerificationTier::Pattern);
    assert_eq!(result.confidence, 0.85);
    assert_eq!(result.evidence_files, vec!["tsconfig.json".to_string()]);

    let framework = claim(
        "The API is written with Express.",
        Testability::Semantic,
        ClaimPayload::Convention { framework: None },
    );
    assert_eq!(verifier.verify_claim(&framework, None).unwrap().verdict, Verdict::Verified);

    let missing_framework = claim(
        "We use React for the frontend",
        Testability::Semantic,
        ClaimPayload::Convention { framework: Some("react".into()) },
    );
    let result = verifier.verify_claim(&missing_framework, None).unwrap();
    assert_eq!(result.verdict, Verdict::Drifted);
    assert!(!result.evidence_files.is_empty());

    let env = claim(
        "Set API_KEY before starting",
        Testability::Semantic,
        ClaimPayload::Environment { variable: None, tool: None, version: None },
    );
    let result = verifier.verify_claim(&env, None).unwrap();
    assert_eq!(result.verdict, Verdict::Verified);
    assert_eq!(
        result.evidence_files,
        vec!["src/app.ts".to_string(), ".env.example".to_string()]
    );

    let tool = claim(
        "Requires Node 20",
        Testability::Semantic,
        ClaimPayload::Environment { variable: None, tool: None, version: None },
    );
    let result = verifier.verify_claim(&tool, None).unwrap();
    assert_eq!(result.verdict, Verdict::Drifted);
    assert_eq!(result.suggested_fix.as_deref(), Some("Requires Node 18"));
}

#[test]
fn test_claims_across_files_route_to_exploration() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let index = index_with(store.clone(), &default_files());
    let verifier = Verifier::new(
        index.clone(),
        Recorder::answering(deep_verdict(Verdict::Verified, &["src/app.ts"])),
        VerifierConfig::default(),
    );

    let claim = claim("Users are loaded lazily", Testability::Semantic, ClaimPayload::Behavior);
    let mappings = vec![
        entity_mapping(&index, &claim, "getUser", 0.85),
        entity_mapping(&index, &claim, "loadUser", 0.85),
        entity_mapping(&index, &claim, "connect", 0.85),
    ];
    store.replace_mappings(claim.id, &mappings).unwrap();

    let decision = verifier.route(&claim).unwrap();
    assert_eq!(decision.path, VerificationPath::Exploration);
    assert_eq!(decision.reason, RoutingReason::MultiFile);

    let result = verifier.verify_claim(&claim, Some("scan-1")).unwrap();
    assert_eq!(result.tier, VerificationTier::Deep);
    assert_eq!(result.verification_path, Some(VerificationPath::Exploration));
    assert_eq!(result.scan_id.as_deref(), Some("scan-1"));

    let metrics = verifier.metrics();
    assert_eq!(metrics.by_route[&RoutingReason::MultiFile], 1);
}

#[test]
fn test_single_entity_bundles_evidence() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let files = default_files();
    let index = index_with(store.clone(), &files);
    let recorder = Recorder::answering(deep_verdict(Verdict::Verified, &["src/app.ts"]));
    let verifier = Verifier::new(index.clone(), recorder, VerifierConfig::default())
        .with_content(move |p: &str| files.get(p).cloned());

    let claim = claim("loadUser reads the API key", Testability::Semantic, ClaimPayload::Behavior);
    store
        .replace_mappings(claim.id, &[entity_mapping(&index, &claim, "loadUser", 0.85)])
        .unwrap();

    let result = verifier.verify_claim(&claim, None).unwrap();
    assert_eq!(result.verdict, Verdict::Verified);
    assert_eq!(result.verification_path, Some(VerificationPath::Bundled));
}

#[test]
fn test_bundled_request_carries_imports_and_types() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let files = default_files();
    let index = index_with(store.clone(), &files);
    let claim = claim("loadUser reads the API key", Testability::Semantic, ClaimPayload::Behavior);
    store
        .replace_mappings(claim.id, &[entity_mapping(&index, &claim, "loadUser", 0.85)])
        .unwrap();

    let evidence = driftwatch_verifier::assemble_evidence(
        &index,
        &|p: &str| files.get(p).cloned(),
        &store.get_mappings(claim.id).unwrap(),
        &VerifierConfig::default(),
    )
    .unwrap()
    .unwrap();

    assert_eq!(evidence.file, "src/app.ts");
    assert!(evidence.text.contains("import express from \"express\";"));
    assert!(evidence.text.contains("export interface User"));
    assert!(evidence.text.contains("export function loadUser"));
    let names: Vec<&str> = evidence.sections.iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["header", "imports", "types", "entity"]);
    assert!(evidence.total_tokens() > 0);
}

#[test]
fn test_oversized_evidence_routes_to_exploration() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let index = index_with(store.clone(), &default_files());
    let config = VerifierConfig {
        evidence_token_cap: 50,
        bundled_token_budget: 50,
        ..VerifierConfig::default()
    };
    let verifier = Verifier::new(index.clone(), UnavailableDeepVerifier, config);

    let claim = claim("getUser returns json", Testability::Semantic, ClaimPayload::Behavior);
    store
        .replace_mappings(claim.id, &[entity_mapping(&index, &claim, "getUser", 0.85)])
        .unwrap();
    assert_eq!(verifier.route(&claim).unwrap().reason, RoutingReason::EvidenceTooLarge);
}

#[test]
fn test_mappings_to_deleted_entities_are_ignored() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let index = index_with(store.clone(), &default_files());
    let verifier = Verifier::new(index.clone(), UnavailableDeepVerifier, VerifierConfig::default());

    let both = claim("Users are loaded by id", Testability::Semantic, ClaimPayload::Behavior);
    store
        .replace_mappings(
            both.id,
            &[
                entity_mapping(&index, &both, "getUser", 0.85),
                entity_mapping(&index, &both, "loadUser", 0.85),
            ],
        )
        .unwrap();
    let only = claim("loadUser reads the API key", Testability::Semantic, ClaimPayload::Behavior);
    store
        .replace_mappings(only.id, &[entity_mapping(&index, &only, "loadUser", 0.85)])
        .unwrap();
    assert_eq!(verifier.route(&both).unwrap().reason, RoutingReason::MultiEntitySmall);

    let start = APP_TS.find("export function loadUser").unwrap();
    let end = APP_TS.find("app.get").unwrap();
    let edited = format!("{}{}", &APP_TS[..start], &APP_TS[end..]);
    index
        .update_from_diff(REPO, &[FileChange::modified("src/app.ts")], &|p: &str| {
            (p == "src/app.ts").then(|| edited.clone())
        })
        .unwrap();
    assert!(index.find_symbol(REPO, "loadUser").unwrap().is_empty());

    let decision = verifier.route(&both).unwrap();
    assert_eq!(decision.path, VerificationPath::Bundled);
    assert_eq!(decision.reason, RoutingReason::SingleEntityMapped);

    let decision = verifier.route(&only).unwrap();
    assert_eq!(decision.path, VerificationPath::Exploration);
    assert_eq!(decision.reason, RoutingReason::FileOnlyMapping);
}

#[test]
fn test_deep_failure_degrades_to_uncertain() {
    let verifier = verifier_for(default_files(), Recorder::failing(), VerifierConfig::default());
    let claim = claim("Requests are retried", Testability::Semantic, ClaimPayload::Behavior);

    let result = verifier.verify_claim(&claim, None).unwrap();
    assert_eq!(result.verdict, Verdict::Uncertain);
    assert_eq!(result.tier, VerificationTier::Deep);
    assert!(result.reasoning.contains("model unavailable"));
    assert_eq!(verifier.metrics().deep_failures, 1);
    assert_eq!(verifier.metrics().by_route[&RoutingReason::NoMapping], 1);
}

#[test]
fn test_deep_drift_without_evidence_is_downgraded() {
    let verifier = verifier_for(
        default_files(),
        Recorder::answering(deep_verdict(Verdict::Drifted, &[])),
        VerifierConfig::default(),
    );
    let claim = claim("Requests are retried", Testability::Semantic, ClaimPayload::Behavior);
    let result = verifier.verify_claim(&claim, None).unwrap();
    assert_eq!(result.verdict, Verdict::Uncertain);
    assert_eq!(result.severity, None);

    let latest = verifier.get_latest_result(claim.id).unwrap().unwrap();
    assert_eq!(latest, result);
}

#[test]
fn test_store_result_round_trip_and_idempotence() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let index = index_with(store.clone(), &default_files());
    let verifier = Verifier::new(index, UnavailableDeepVerifier, VerifierConfig::default());

    let claim = path_claim("src/app.ts");
    store.upsert_claim(&claim).unwrap();

    let result = VerificationResult::verified(claim.id, VerificationTier::Deep, 0.9, "looks right");
    let stored = verifier.store_result(result.clone()).unwrap();
    assert!((stored.confidence - 0.6).abs() < 1e-9);

    let again = verifier.store_result(result).unwrap();
    assert_eq!(again.id, stored.id);
    assert_eq!(verifier.metrics().duplicate_writes, 1);
    assert_eq!(verifier.metrics().total_results(), 1);

    let latest = verifier.get_latest_result(claim.id).unwrap().unwrap();
    assert_eq!(latest.verdict, Verdict::Verified);
    assert!(latest.confidence <= 0.9 - 0.3 + 1e-9);

    let status = store.claim_status(claim.id).unwrap().unwrap();
    assert_eq!(status.result_id, stored.id);
}

#[test]
fn test_merge_results_on_disk() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::new(dir.path().join("driftwatch.db")).unwrap());
    let index = index_with(store, &default_files());
    let verifier = Verifier::new(index, UnavailableDeepVerifier, VerifierConfig::default());

    let first = path_claim("src/app.ts");
    let second = path_claim("src/db.ts");

    let mut t1 = VerificationResult::verified(first.id, VerificationTier::Deterministic, 1.0, "t1")
        .with_evidence(["src/app.ts"])
        .in_scan(Some("scan-9".into()));
    t1.created_at = 1_000;
    let mut t4 = VerificationResult::drifted(first.id, VerificationTier::Deep, 0.7, Severity::Low, "t4")
        .with_evidence(["src/app.ts"])
        .in_scan(Some("scan-9".into()));
    t4.created_at = 1_000;
    let mut other = VerificationResult::verified(second.id, VerificationTier::Deterministic, 1.0, "db")
        .with_evidence(["src/db.ts"])
        .in_scan(Some("scan-9".into()));
    other.created_at = 900;

    for result in [t1, t4, other] {
        verifier.store_result(result).unwrap();
    }

    let merged = verifier.merge_results("scan-9").unwrap();
    assert_eq!(merged.len(), 2);
    let for_first = merged.iter().find(|r| r.claim_id == first.id).unwrap();
    assert_eq!(for_first.tier, VerificationTier::Deep);
    assert!(verifier.merge_results("scan-unknown").unwrap().is_empty());
}
