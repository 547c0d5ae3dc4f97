//! The claim mapper service

use crate::strategy::{policy, DirectReference, MappingCandidate, MappingStrategy, SemanticSearch, SymbolSearch};
use crate::{MapperConfig, MapperError};
use driftwatch_domain::traits::{CoChangeSource, IndexStore, MappingStore};
use driftwatch_domain::{Claim, ClaimId, ClaimMapping, EntityId, MappingId, MappingMethod, NoCoChange};
use driftwatch_index::CodebaseIndex;
use std::collections::HashMap;
use std::sync::Arc;

/// Links claims to the code they describe
///
/// Runs the strategies the policy table lists for a claim's type, boosts each
/// candidate by co-change history, keeps the best candidate per location and
/// replaces the claim's stored mappings with the result.
///
/// # Examples
///
/// ```no_run
/// use driftwatch_index::{CodebaseIndex, IndexConfig};
/// use driftwatch_mapper::{Mapper, MapperConfig};
/// use driftwatch_store::SqliteStore;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let claim: driftwatch_domain::Claim = unimplemented!();
/// let store = Arc::new(SqliteStore::new("driftwatch.db")?);
/// let index = Arc::new(CodebaseIndex::new(store, IndexConfig::default()));
/// let mapper = Mapper::new(index, MapperConfig::default());
///
/// for mapping in mapper.map_claim(&claim)? {
///     println!("{} ({:.2})", mapping.code_file, mapping.confidence);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Mapper<S> {
    index: Arc<CodebaseIndex<S>>,
    co_change: Box<dyn CoChangeSource>,
    strategies: Vec<Box<dyn MappingStrategy<S>>>,
    config: MapperConfig,
}

impl<S> Mapper<S>
where
    S: IndexStore + MappingStore + 'static,
{
    /// Create a mapper with no co-change history
    pub fn new(index: Arc<CodebaseIndex<S>>, config: MapperConfig) -> Self {
        Self::with_co_change(index, Box::new(NoCoChange), config)
    }

    /// Create a mapper with a co-change collaborator
    pub fn with_co_change(
        index: Arc<CodebaseIndex<S>>,
        co_change: Box<dyn CoChangeSource>,
        config: MapperConfig,
    ) -> Self {
        let strategies: Vec<Box<dyn MappingStrategy<S>>> = vec![
            Box::new(DirectReference::new(&config)),
            Box::new(SymbolSearch::new(&config)),
            Box::new(SemanticSearch::new(&config)),
        ];
        Self {
            index,
            co_change,
            strategies,
            config,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// The index the mapper queries
    pub fn index(&self) -> &Arc<CodebaseIndex<S>> {
        &self.index
    }

    fn strategy(&self, method: MappingMethod) -> Option<&dyn MappingStrategy<S>> {
        self.strategies
            .iter()
            .find(|s| s.method() == method)
            .map(|s| s.as_ref())
    }

    /// Compute and store the mappings of a claim, highest confidence first
    ///
    /// Prior mappings are replaced in one transaction, so mapping the same
    /// claim against an unchanged index is idempotent. An empty result means
    /// nothing in the index matched.
    pub fn map_claim(&self, claim: &Claim) -> Result<Vec<ClaimMapping>, MapperError> {
        let mut found: Vec<MappingCandidate> = Vec::new();
        for method in policy(claim.claim_type()) {
            if let Some(strategy) = self.strategy(*method) {
                let more = strategy.candidates(&self.index, claim, &found)?;
                found.extend(more);
            }
        }

        let mappings = self.finalize(claim, found);
        self.index
            .store()
            .replace_mappings(claim.id, &mappings)
            .map_err(MapperError::store)?;

        tracing::debug!(
            claim_id = %claim.id,
            claim_type = %claim.claim_type(),
            mappings = mappings.len(),
            "Claim mapped"
        );
        Ok(mappings)
    }

    /// Stored mappings of a claim, highest confidence first
    pub fn get_mappings(&self, claim_id: ClaimId) -> Result<Vec<ClaimMapping>, MapperError> {
        self.index
            .store()
            .get_mappings(claim_id)
            .map_err(MapperError::store)
    }

    /// Boost, deduplicate and rank candidates
    fn finalize(&self, claim: &Claim, candidates: Vec<MappingCandidate>) -> Vec<ClaimMapping> {
        let mut best: HashMap<(String, Option<EntityId>), ClaimMapping> = HashMap::new();
        for candidate in candidates {
            let boost = self
                .co_change
                .co_change_boost(&claim.repo_id, &candidate.code_file, &claim.source_file)
                .clamp(0.0, 1.0);
            let base = candidate.confidence.clamp(0.0, 1.0);
            let confidence = (base + boost).min(1.0);

            let mapping = ClaimMapping {
                id: MappingId::new(),
                claim_id: claim.id,
                code_file: candidate.code_file,
                code_entity_id: candidate.code_entity_id,
                confidence,
                co_change_boost: confidence - base,
                mapping_method: candidate.method,
            };
            let key = (mapping.code_file.clone(), mapping.code_entity_id);
            match best.get(&key) {
                Some(existing) if existing.confidence >= mapping.confidence => {}
                _ => {
                    best.insert(key, mapping);
                }
            }
        }

        let mut mappings: Vec<ClaimMapping> = best.into_values().collect();
        mappings.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.code_file.cmp(&b.code_file))
                .then_with(|| a.code_entity_id.cmp(&b.code_entity_id))
        });
        mappings
    }
}
