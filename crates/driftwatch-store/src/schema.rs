//! Database schema
//!
//! Ids are 16-byte big-endian UUIDv7 blobs. Maps and lists (dependencies,
//! scripts, keywords, evidence files) are JSON text columns.

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;

/// Full schema, idempotent
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    repo_id TEXT NOT NULL,
    path TEXT NOT NULL,
    PRIMARY KEY (repo_id, path)
);

CREATE TABLE IF NOT EXISTS code_entities (
    id BLOB PRIMARY KEY,
    repo_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    line_number INTEGER NOT NULL,
    end_line_number INTEGER NOT NULL,
    entity_type TEXT NOT NULL,
    name TEXT NOT NULL,
    signature TEXT NOT NULL,
    raw_code TEXT NOT NULL,
    embedding BLOB
);

CREATE INDEX IF NOT EXISTS idx_entities_file ON code_entities(repo_id, file_path);
CREATE INDEX IF NOT EXISTS idx_entities_name ON code_entities(repo_id, name);
CREATE INDEX IF NOT EXISTS idx_entities_type ON code_entities(repo_id, entity_type);

CREATE TABLE IF NOT EXISTS repo_manifests (
    repo_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    source TEXT NOT NULL,
    dependencies TEXT NOT NULL,
    dev_dependencies TEXT NOT NULL,
    scripts TEXT NOT NULL,
    engines TEXT NOT NULL,
    PRIMARY KEY (repo_id, file_path)
);

CREATE TABLE IF NOT EXISTS claims (
    id BLOB PRIMARY KEY,
    repo_id TEXT NOT NULL,
    source_file TEXT NOT NULL,
    line_number INTEGER NOT NULL,
    claim_text TEXT NOT NULL,
    claim_type TEXT NOT NULL,
    testability TEXT NOT NULL,
    payload TEXT NOT NULL,
    keywords TEXT NOT NULL,
    verification_status TEXT,
    status_confidence REAL,
    status_result_id BLOB,
    last_verified_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_claims_repo ON claims(repo_id);

CREATE TABLE IF NOT EXISTS claim_mappings (
    id BLOB PRIMARY KEY,
    claim_id BLOB NOT NULL,
    code_file TEXT NOT NULL,
    code_entity_id BLOB,
    confidence REAL NOT NULL,
    co_change_boost REAL NOT NULL,
    mapping_method TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_mappings_location
    ON claim_mappings(claim_id, code_file, COALESCE(code_entity_id, X''));

CREATE TABLE IF NOT EXISTS verification_results (
    id BLOB PRIMARY KEY,
    claim_id BLOB NOT NULL,
    scan_id TEXT,
    verdict TEXT NOT NULL,
    confidence REAL NOT NULL,
    tier INTEGER NOT NULL,
    severity TEXT,
    reasoning TEXT NOT NULL,
    specific_mismatch TEXT,
    suggested_fix TEXT,
    evidence_files TEXT NOT NULL,
    verification_path INTEGER,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_claim ON verification_results(claim_id, created_at);
CREATE INDEX IF NOT EXISTS idx_results_scan ON verification_results(scan_id);
"#;
