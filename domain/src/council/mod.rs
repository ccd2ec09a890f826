//! Council deliberation domain
//!
//! Core types and pure logic for the 3-stage pipeline:
//!
//! - Stage 1: independent answers from every council member
//! - Stage 2: anonymized peer ranking of those answers
//! - Stage 3: chairman synthesis with a consensus-derived confidence label
//!
//! Everything here is pure domain logic with no I/O and no sessions.

pub mod aggregate;
pub mod confidence;
pub mod labels;
pub mod parsing;
pub mod stage;

pub use aggregate::{AggregateEntry, aggregate_rankings};
pub use confidence::{ConfidenceScore, ModelConsensus, consensus_metrics, overall_confidence};
pub use labels::LabelMap;
pub use parsing::parse_ranking_labels;
pub use stage::{Stage1Response, Stage2Ranking, Stage3Result, TokenUsage};
