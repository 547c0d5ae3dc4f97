//! End-to-end tests of the command layer against a checkout on disk.

use driftwatch_cli::cli::{IndexArgs, LatestArgs, MergeArgs, VerifyArgs};
use driftwatch_cli::commands::{run_index, run_latest, run_merge, run_verify};
use driftwatch_cli::{CliError, Config};
use driftwatch_domain::{Severity, Verdict, VerificationTier};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PACKAGE_JSON: &str = r#"{
  "name": "api",
  "dependencies": { "express": "^4.18.2" },
  "scripts": { "build": "tsc", "test": "jest" }
}"#;

const APP_TS: &str = r#"import express from "express";

export function getUser(req, res) {
  res.json({ id: req.params.id });
}

const app = express();
app.get("/users/:id", getUser);
"#;

const CLAIMS: &str = r#"[
  {
    "source_file": "README.md",
    "line_number": 4,
    "claim_text": "The server lives in `src/app.ts`",
    "claim_type": "path_reference",
    "testability": "syntactic",
    "extracted_value": { "path": "src/app.ts" }
  },
  {
    "source_file": "README.md",
    "line_number": 9,
    "claim_text": "Run `npm run biuld` to compile",
    "claim_type": "command",
    "testability": "syntactic",
    "extracted_value": { "runner": "npm", "script": "run biuld" }
  },
  {
    "source_file": "docs/design.md",
    "line_number": 2,
    "claim_text": "Failed requests are retried three times",
    "claim_type": "behavior",
    "testability": "semantic"
  }
]"#;

struct Workspace {
    _dir: TempDir,
    root: PathBuf,
    claims: PathBuf,
    config: Config,
}

fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("checkout");
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("package.json"), PACKAGE_JSON).unwrap();
    fs::write(root.join("src/app.ts"), APP_TS).unwrap();
    fs::write(root.join("README.md"), "# api\n").unwrap();

    let claims = dir.path().join("claims.json");
    fs::write(&claims, CLAIMS).unwrap();

    let mut config = Config::default();
    config.database.path = Some(dir.path().join("state").join("driftwatch.db"));
    config.settings.repo_id = "acme/api".into();

    Workspace {
        _dir: dir,
        root,
        claims,
        config,
    }
}

fn index(ws: &Workspace, changed: &[&str]) -> driftwatch_domain::IndexUpdateReport {
    let args = IndexArgs {
        root: ws.root.clone(),
        changed: changed.iter().map(|s| s.to_string()).collect(),
    };
    run_index(&args, &ws.config).unwrap()
}

fn verify(ws: &Workspace, scan_id: &str) -> Vec<driftwatch_domain::VerificationResult> {
    let args = VerifyArgs {
        claims: ws.claims.clone(),
        root: ws.root.clone(),
        scan_id: Some(scan_id.into()),
        llm: false,
    };
    let (scan, results) = run_verify(&args, &ws.config).unwrap();
    assert_eq!(scan, scan_id);
    results
}

#[test]
fn test_index_creates_database() {
    let ws = workspace();
    let report = index(&ws, &[]);
    assert!(report.added > 0);
    assert!(ws.config.database.path.as_deref().is_some_and(Path::exists));
}

#[test]
fn test_verify_claims_file() {
    let ws = workspace();
    index(&ws, &[]);
    let results = verify(&ws, "pr-1");
    assert_eq!(results.len(), 3);

    assert_eq!(results[0].verdict, Verdict::Verified);
    assert_eq!(results[0].tier, VerificationTier::Deterministic);

    assert_eq!(results[1].verdict, Verdict::Drifted);
    assert_eq!(results[1].severity, Some(Severity::High));
    assert_eq!(results[1].suggested_fix.as_deref(), Some("Run `npm run build` to compile"));

    // No model configured
    assert_eq!(results[2].verdict, Verdict::Uncertain);
    assert_eq!(results[2].tier, VerificationTier::Deep);
    assert_eq!(results[2].confidence, 0.0);
}

#[test]
fn test_latest_and_merge() {
    let ws = workspace();
    index(&ws, &[]);
    let first = verify(&ws, "pr-1");

    let latest = run_latest(
        &LatestArgs {
            claim_id: first[1].claim_id.to_string(),
        },
        &ws.config,
    )
    .unwrap()
    .unwrap();
    assert_eq!(latest.id, first[1].id);

    let merged = run_merge(&MergeArgs { scan_id: "pr-1".into() }, &ws.config).unwrap();
    assert_eq!(merged.len(), 3);

    let other = run_merge(&MergeArgs { scan_id: "pr-2".into() }, &ws.config).unwrap();
    assert!(other.is_empty());
}

#[test]
fn test_changed_file_removed_from_disk() {
    let ws = workspace();
    index(&ws, &[]);
    fs::remove_file(ws.root.join("src/app.ts")).unwrap();
    let report = index(&ws, &["src/app.ts"]);
    assert!(report.removed > 0);

    // Missing with no close match, so the drift carries no evidence
    let results = verify(&ws, "pr-2");
    assert_eq!(results[0].verdict, Verdict::Uncertain);
    assert!(results[0].reasoning.contains("downgraded"));
}

#[test]
fn test_latest_rejects_bad_claim_id() {
    let ws = workspace();
    let result = run_latest(
        &LatestArgs {
            claim_id: "not-a-uuid".into(),
        },
        &ws.config,
    );
    assert!(matches!(result, Err(CliError::InvalidInput(_))));
}

#[test]
fn test_missing_claims_file() {
    let ws = workspace();
    let args = VerifyArgs {
        claims: ws.root.join("absent.json"),
        root: ws.root.clone(),
        scan_id: None,
        llm: false,
    };
    assert!(matches!(run_verify(&args, &ws.config), Err(CliError::Io(_))));
}
