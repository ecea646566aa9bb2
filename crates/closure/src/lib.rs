//! Entity closure resolution.
//!
//! Starting from a partial identifier, discovers every record linked to the
//! same entity across both stores:
//!
//! 1. Classify the seed into initial keys ([`Seed::classify`])
//! 2. Expand keys pass by pass until no new ones appear ([`KeyExpander`])
//! 3. Collect every row found, per table ([`RecordAggregator`])
//!
//! Per-table failures never abort a resolution; they are returned as
//! [`ClosureWarning`]s alongside whatever was found.

pub mod aggregator;
pub mod config;
pub mod context;
pub mod error;
pub mod expander;
pub mod graph;
pub mod keyset;
pub mod link;
pub mod seed;
pub mod warning;

pub use aggregator::{EntityClosure, RecordAggregator, Termination};
pub use config::{ExpansionBudget, ExpansionConfig};
pub use context::{EngineContext, StoreHandle};
pub use error::ClosureError;
pub use expander::{Expansion, KeyExpander};
pub use graph::{KeyGraph, TableRef};
pub use keyset::KeySet;
pub use link::Link;
pub use seed::Seed;
pub use warning::ClosureWarning;

/// Resolve everything linked to `seed`.
pub async fn resolve_entity_closure(
    ctx: &EngineContext,
    seed: &str,
) -> Result<EntityClosure, ClosureError> {
    let classified = Seed::classify(seed)?;
    resolve_seed(ctx, seed.trim(), &classified).await
}

/// Resolve from an already classified seed. `label` names the seed in the
/// result.
pub async fn resolve_seed(
    ctx: &EngineContext,
    label: &str,
    seed: &Seed,
) -> Result<EntityClosure, ClosureError> {
    let expander = KeyExpander::new(ctx)?;
    let expansion = expander.expand(seed).await?;
    Ok(expansion.into_closure(label))
}
