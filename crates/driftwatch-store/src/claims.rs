//! Claims, mappings and verification results

use crate::{column_enum, column_id, column_json, column_opt_id, id_to_bytes, SqliteStore};
use driftwatch_domain::traits::{ClaimStore, MappingStore, ResultStore};
use driftwatch_domain::{
    Claim, ClaimId, ClaimMapping, ClaimStatus, EntityId, MappingId, MappingMethod, ResultId,
    Severity, Testability, Verdict, VerificationPath, VerificationResult, VerificationTier,
};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

const RESULT_COLUMNS: &str = "id, claim_id, scan_id, verdict, confidence, tier, severity, reasoning,
     specific_mismatch, suggested_fix, evidence_files, verification_path, created_at";

fn testability_str(t: Testability) -> &'static str {
    match t {
        Testability::Syntactic => "syntactic",
        Testability::Semantic => "semantic",
    }
}

fn parse_testability(s: &str) -> Option<Testability> {
    match s {
        "syntactic" => Some(Testability::Syntactic),
        "semantic" => Some(Testability::Semantic),
        _ => None,
    }
}

fn tier_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<VerificationTier> {
    let n: u8 = row.get(idx)?;
    VerificationTier::from_number(n).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, n as i64))
}

fn row_to_claim(row: &Row<'_>) -> rusqlite::Result<Claim> {
    Ok(Claim {
        id: ClaimId::from_value(column_id(row, 0)?),
        repo_id: row.get(1)?,
        source_file: row.get(2)?,
        line_number: row.get(3)?,
        claim_text: row.get(4)?,
        testability: column_enum(row, 5, parse_testability)?,
        payload: column_json(row, 6)?,
        keywords: column_json(row, 7)?,
    })
}

fn row_to_mapping(row: &Row<'_>) -> rusqlite::Result<ClaimMapping> {
    Ok(ClaimMapping {
        id: MappingId::from_value(column_id(row, 0)?),
        claim_id: ClaimId::from_value(column_id(row, 1)?),
        code_file: row.get(2)?,
        code_entity_id: column_opt_id(row, 3)?.map(EntityId::from_value),
        confidence: row.get(4)?,
        co_change_boost: row.get(5)?,
        mapping_method: column_enum(row, 6, MappingMethod::parse)?,
    })
}

fn row_to_result(row: &Row<'_>) -> rusqlite::Result<VerificationResult> {
    let severity: Option<String> = row.get(6)?;
    let severity = severity
        .map(|s| {
            Severity::parse(&s).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    Type::Text,
                    format!("Unknown severity: {}", s).into(),
                )
            })
        })
        .transpose()?;
    let path: Option<u8> = row.get(11)?;

    Ok(VerificationResult {
        id: ResultId::from_value(column_id(row, 0)?),
        claim_id: ClaimId::from_value(column_id(row, 1)?),
        scan_id: row.get(2)?,
        verdict: column_enum(row, 3, Verdict::parse)?,
        confidence: row.get(4)?,
        tier: tier_column(row, 5)?,
        severity,
        reasoning: row.get(7)?,
        specific_mismatch: row.get(8)?,
        suggested_fix: row.get(9)?,
        evidence_files: column_json(row, 10)?,
        verification_path: path.and_then(VerificationPath::from_number),
        created_at: row.get::<_, i64>(12)? as u64,
    })
}

impl ClaimStore for SqliteStore {
    fn upsert_claim(&self, claim: &Claim) -> Result<(), Self::Error> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO claims
                 (id, repo_id, source_file, line_number, claim_text, claim_type, testability, payload, keywords)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                 repo_id = excluded.repo_id,
                 source_file = excluded.source_file,
                 line_number = excluded.line_number,
                 claim_text = excluded.claim_text,
                 claim_type = excluded.claim_type,
                 testability = excluded.testability,
                 payload = excluded.payload,
                 keywords = excluded.keywords",
            params![
                id_to_bytes(claim.id.value()),
                claim.repo_id,
                claim.source_file,
                claim.line_number,
                claim.claim_text,
                claim.claim_type().as_str(),
                testability_str(claim.testability),
                serde_json::to_string(&claim.payload)?,
                serde_json::to_string(&claim.keywords)?,
            ],
        )?;
        Ok(())
    }

    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>, Self::Error> {
        let conn = self.conn()?;
        let claim = conn
            .query_row(
                "SELECT id, repo_id, source_file, line_number, claim_text, testability, payload, keywords
                 FROM claims WHERE id = ?1",
                params![id_to_bytes(id.value())],
                row_to_claim,
            )
            .optional()?;
        Ok(claim)
    }

    fn claim_status(&self, id: ClaimId) -> Result<Option<ClaimStatus>, Self::Error> {
        let conn = self.conn()?;
        let status = conn
            .query_row(
                "SELECT verification_status, status_confidence, status_result_id, last_verified_at
                 FROM claims WHERE id = ?1 AND verification_status IS NOT NULL",
                params![id_to_bytes(id.value())],
                |row| {
                    Ok(ClaimStatus {
                        verdict: column_enum(row, 0, Verdict::parse)?,
                        confidence: row.get(1)?,
                        result_id: ResultId::from_value(column_id(row, 2)?),
                        verified_at: row.get::<_, i64>(3)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(status)
    }
}

impl MappingStore for SqliteStore {
    fn replace_mappings(
        &self,
        claim_id: ClaimId,
        mappings: &[ClaimMapping],
    ) -> Result<(), Self::Error> {
        let claim_bytes = id_to_bytes(claim_id.value());
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM claim_mappings WHERE claim_id = ?1",
            params![claim_bytes],
        )?;
        for mapping in mappings {
            tx.execute(
                "INSERT OR REPLACE INTO claim_mappings
                     (id, claim_id, code_file, code_entity_id, confidence, co_change_boost, mapping_method)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id_to_bytes(mapping.id.value()),
                    claim_bytes,
                    mapping.code_file,
                    mapping.code_entity_id.map(|e| id_to_bytes(e.value())),
                    mapping.confidence,
                    mapping.co_change_boost,
                    mapping.mapping_method.as_str(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_mappings(&self, claim_id: ClaimId) -> Result<Vec<ClaimMapping>, Self::Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, claim_id, code_file, code_entity_id, confidence, co_change_boost, mapping_method
             FROM claim_mappings WHERE claim_id = ?1
             ORDER BY confidence DESC, code_file, rowid",
        )?;
        let mappings = stmt
            .query_map(params![id_to_bytes(claim_id.value())], row_to_mapping)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(mappings)
    }
}

impl ResultStore for SqliteStore {
    fn insert_result(&self, result: &VerificationResult) -> Result<bool, Self::Error> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO verification_results
                 (id, claim_id, scan_id, verdict, confidence, tier, severity, reasoning,
                  specific_mismatch, suggested_fix, evidence_files, verification_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id_to_bytes(result.id.value()),
                id_to_bytes(result.claim_id.value()),
                result.scan_id,
                result.verdict.as_str(),
                result.confidence,
                result.tier.number(),
                result.severity.map(|s| s.as_str()),
                result.reasoning,
                result.specific_mismatch,
                result.suggested_fix,
                serde_json::to_string(&result.evidence_files)?,
                result.verification_path.map(|p| p.number()),
                result.created_at as i64,
            ],
        )? > 0;

        if inserted {
            // Only a newer result moves the cached status
            tx.execute(
                "UPDATE claims
                 SET verification_status = ?2, status_confidence = ?3,
                     status_result_id = ?4, last_verified_at = ?5
                 WHERE id = ?1 AND (last_verified_at IS NULL OR last_verified_at <= ?5)",
                params![
                    id_to_bytes(result.claim_id.value()),
                    result.verdict.as_str(),
                    result.confidence,
                    id_to_bytes(result.id.value()),
                    result.created_at as i64,
                ],
            )?;
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn latest_result(&self, claim_id: ClaimId) -> Result<Option<VerificationResult>, Self::Error> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM verification_results WHERE claim_id = ?1
             ORDER BY created_at DESC, tier DESC, id DESC LIMIT 1",
            RESULT_COLUMNS
        );
        let result = conn
            .query_row(&sql, params![id_to_bytes(claim_id.value())], row_to_result)
            .optional()?;
        Ok(result)
    }

    fn results_for_scan(&self, scan_id: &str) -> Result<Vec<VerificationResult>, Self::Error> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM verification_results WHERE scan_id = ?1
             ORDER BY claim_id, created_at, tier",
            RESULT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(params![scan_id], row_to_result)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(results)
    }
}
