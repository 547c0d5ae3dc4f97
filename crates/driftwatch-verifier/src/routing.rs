//! Cost routing for deep verification

use crate::{VerifierConfig, VerifierError};
use driftwatch_domain::traits::IndexStore;
use driftwatch_domain::{ClaimMapping, RoutingDecision, RoutingReason, VerificationPath};
use driftwatch_index::CodebaseIndex;
use std::collections::BTreeSet;

/// Decide between bundled evidence (Path 1) and exploration (Path 2)
///
/// Exploration is chosen when there is nothing precise to bundle: no
/// mappings, mappings spread over several files, mappings without live entities,
/// or entity evidence estimated above the token cap.
pub fn route_claim<S: IndexStore>(
    index: &CodebaseIndex<S>,
    mappings: &[ClaimMapping],
    config: &VerifierConfig,
) -> Result<RoutingDecision, VerifierError> {
    let explore = |reason, entity_token_estimate| RoutingDecision {
        path: VerificationPath::Exploration,
        reason,
        entity_token_estimate,
    };

    if mappings.is_empty() {
        return Ok(explore(RoutingReason::NoMapping, 0));
    }
    let files: BTreeSet<&str> = mappings.iter().map(|m| m.code_file.as_str()).collect();
    if files.len() > 1 {
        return Ok(explore(RoutingReason::MultiFile, 0));
    }

    let entity_ids: BTreeSet<_> = mappings.iter().filter_map(|m| m.code_entity_id).collect();

    // Mappings can outlive the entity they point at
    let mut found = 0usize;
    let mut lines = 0usize;
    for id in &entity_ids {
        if let Some(entity) = index.get_entity(*id)? {
            found += 1;
            lines += entity.line_count() as usize;
        }
    }
    if found == 0 {
        return Ok(explore(RoutingReason::FileOnlyMapping, 0));
    }

    let estimate = config.tokens_for_lines(lines) + config.import_budget_tokens;
    if estimate > config.evidence_token_cap {
        return Ok(explore(RoutingReason::EvidenceTooLarge, estimate));
    }

    let reason = if found == 1 {
        RoutingReason::SingleEntityMapped
    } else {
        RoutingReason::MultiEntitySmall
    };
    Ok(RoutingDecision {
        path: VerificationPath::Bundled,
        reason,
        entity_token_estimate: estimate,
    })
}
