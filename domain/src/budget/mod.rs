//! Session budget policy and the execution-mode router.

pub mod estimate;
pub mod policy;
pub mod router;

pub use estimate::{estimate_chat_cost, estimate_council_cost};
pub use policy::SessionBudgetPolicy;
pub use router::{
    ContextTier, ExecutionMode, RouteReason, TaskIntent, TierCeilings, classify_intent, route,
};
