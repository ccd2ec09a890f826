//! Budget router: pure mapping from spend state and query to an
//! execution mode.
//!
//! The router never rejects a request. Over-budget turns degrade context
//! size and model tier; the quality floor elsewhere guarantees retrieval
//! still supplies at least one relevant chunk when one exists.

use serde::{Deserialize, Serialize};

use crate::core::model::ModelTier;

/// Heuristic task classification of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskIntent {
    Quick,
    Standard,
    Research,
}

impl TaskIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskIntent::Quick => "quick",
            TaskIntent::Standard => "standard",
            TaskIntent::Research => "research",
        }
    }
}

/// Context-size tier: the retrieval token ceiling for the turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextTier {
    Low,
    Medium,
    High,
}

impl ContextTier {
    /// Retrieval token ceiling for this tier, at the default settings.
    pub fn token_ceiling(&self) -> usize {
        TierCeilings::default().ceiling(*self)
    }

    fn for_intent(intent: TaskIntent) -> Self {
        match intent {
            TaskIntent::Quick => ContextTier::Low,
            TaskIntent::Standard => ContextTier::Medium,
            TaskIntent::Research => ContextTier::High,
        }
    }
}

/// Token ceilings per context tier, overridable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCeilings {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl Default for TierCeilings {
    fn default() -> Self {
        Self {
            low: 4_000,
            medium: 8_000,
            high: 16_000,
        }
    }
}

impl TierCeilings {
    pub fn ceiling(&self, tier: ContextTier) -> usize {
        match tier {
            ContextTier::Low => self.low,
            ContextTier::Medium => self.medium,
            ContextTier::High => self.high,
        }
    }
}

/// Why the router chose what it chose (for the run-plan log line)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    NoBudget,
    BudgetUnder70,
    Budget70To85,
    Budget85To100,
    BudgetOver100,
}

impl RouteReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteReason::NoBudget => "no_budget",
            RouteReason::BudgetUnder70 => "budget_under_70",
            RouteReason::Budget70To85 => "budget_70_85",
            RouteReason::Budget85To100 => "budget_85_100",
            RouteReason::BudgetOver100 => "budget_over_100",
        }
    }
}

/// The routing decision for a single turn. Recomputed every turn, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMode {
    /// Effective mode after budget clamping
    pub mode: TaskIntent,
    pub context_tier: ContextTier,
    pub model_tier: ModelTier,
    /// Output token cap for the turn's answer call
    pub max_output_tokens: u32,
    /// What the query looked like before clamping
    pub task_intent: TaskIntent,
    pub reason: RouteReason,
}

fn model_tier_for(intent: TaskIntent) -> ModelTier {
    match intent {
        TaskIntent::Quick => ModelTier::Budget,
        TaskIntent::Standard | TaskIntent::Research => ModelTier::Mid,
    }
}

fn max_output_tokens_for(intent: TaskIntent) -> u32 {
    match intent {
        TaskIntent::Quick => 500,
        TaskIntent::Standard => 1_000,
        TaskIntent::Research => 2_000,
    }
}

const QUICK_KEYWORDS: &[&str] = &["quick", "briefly", "short", "summary", "tldr"];
const RESEARCH_KEYWORDS: &[&str] = &["cite", "paper", "compare", "analyze", "research", "study"];
const RESEARCH_QUERY_LENGTH: usize = 200;

/// Classify a query as quick / standard / research from length and
/// keyword cues. Research cues win over quick cues.
pub fn classify_intent(query: &str) -> TaskIntent {
    let lower = query.to_lowercase();

    if query.len() > RESEARCH_QUERY_LENGTH
        || RESEARCH_KEYWORDS.iter().any(|k| lower.contains(k))
    {
        return TaskIntent::Research;
    }

    if QUICK_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return TaskIntent::Quick;
    }

    TaskIntent::Standard
}

/// Pure routing function: `(spent, budget, query) -> ExecutionMode`.
///
/// Spend-ratio brackets are inclusive at the lower boundary: exactly 0.70
/// still routes from task intent.
pub fn route(spent_usd: f64, budget_usd: Option<f64>, query: &str) -> ExecutionMode {
    let task_intent = classify_intent(query);

    let ratio = match budget_usd {
        Some(budget) if budget > 0.0 => Some(spent_usd / budget),
        _ => None,
    };

    let (mode, context_tier, reason) = match ratio {
        None => (task_intent, ContextTier::for_intent(task_intent), RouteReason::NoBudget),
        Some(r) if r <= 0.70 => (
            task_intent,
            ContextTier::for_intent(task_intent),
            RouteReason::BudgetUnder70,
        ),
        Some(r) if r <= 0.85 => (TaskIntent::Standard, ContextTier::Medium, RouteReason::Budget70To85),
        Some(r) if r <= 1.00 => (TaskIntent::Quick, ContextTier::Low, RouteReason::Budget85To100),
        Some(_) => (TaskIntent::Quick, ContextTier::Low, RouteReason::BudgetOver100),
    };

    ExecutionMode {
        mode,
        context_tier,
        model_tier: model_tier_for(mode),
        max_output_tokens: max_output_tokens_for(mode),
        task_intent,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_quick_keywords() {
        assert_eq!(classify_intent("briefly, what is TCP?"), TaskIntent::Quick);
        assert_eq!(classify_intent("give me a tldr"), TaskIntent::Quick);
    }

    #[test]
    fn test_classify_research_keywords_beat_quick() {
        assert_eq!(
            classify_intent("briefly compare the two protocols"),
            TaskIntent::Research
        );
        assert_eq!(classify_intent("analyze this design"), TaskIntent::Research);
    }

    #[test]
    fn test_classify_long_query_is_research() {
        let long = "x".repeat(201);
        assert_eq!(classify_intent(&long), TaskIntent::Research);
    }

    #[test]
    fn test_classify_default_standard() {
        assert_eq!(classify_intent("what is a monad?"), TaskIntent::Standard);
    }

    #[test]
    fn test_no_budget_uses_task_intent() {
        let mode = route(1000.0, None, "analyze the tradeoffs");
        assert_eq!(mode.mode, TaskIntent::Research);
        assert_eq!(mode.context_tier, ContextTier::High);
        assert_eq!(mode.max_output_tokens, 2_000);
        assert_eq!(mode.reason, RouteReason::NoBudget);
    }

    #[test]
    fn test_boundary_exactly_070_uses_task_intent() {
        let mode = route(0.70, Some(1.0), "analyze the tradeoffs");
        assert_eq!(mode.mode, TaskIntent::Research);
        assert_eq!(mode.reason, RouteReason::BudgetUnder70);
    }

    #[test]
    fn test_bracket_70_85_clamps_to_standard() {
        let mode = route(0.75, Some(1.0), "analyze everything in depth please");
        assert_eq!(mode.mode, TaskIntent::Standard);
        assert_eq!(mode.context_tier, ContextTier::Medium);
        assert_eq!(mode.context_tier.token_ceiling(), 8_000);
        assert_eq!(mode.reason, RouteReason::Budget70To85);
        // The pre-clamp intent is preserved for observability
        assert_eq!(mode.task_intent, TaskIntent::Research);
    }

    #[test]
    fn test_bracket_85_100_clamps_to_quick() {
        // ratio 0.90, regardless of query length
        let long = "analyze ".repeat(60);
        let mode = route(1.80, Some(2.0), &long);
        assert_eq!(mode.mode, TaskIntent::Quick);
        assert_eq!(mode.context_tier, ContextTier::Low);
        assert_eq!(mode.context_tier.token_ceiling(), 4_000);
        assert_eq!(mode.model_tier, ModelTier::Budget);
        assert_eq!(mode.max_output_tokens, 500);
        assert_eq!(mode.reason, RouteReason::Budget85To100);
    }

    #[test]
    fn test_over_budget_stays_minimal_never_rejects() {
        let mode = route(3.0, Some(1.0), "research this thoroughly");
        assert_eq!(mode.mode, TaskIntent::Quick);
        assert_eq!(mode.context_tier, ContextTier::Low);
        assert_eq!(mode.reason, RouteReason::BudgetOver100);
    }

    #[test]
    fn test_route_is_pure() {
        let a = route(0.9, Some(2.0), "same query");
        let b = route(0.9, Some(2.0), "same query");
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_budget_treated_as_unconstrained() {
        let mode = route(5.0, Some(0.0), "hello there");
        assert_eq!(mode.reason, RouteReason::NoBudget);
    }

    #[test]
    fn test_tier_ceilings_default_and_override() {
        let defaults = TierCeilings::default();
        assert_eq!(defaults.ceiling(ContextTier::Low), 4_000);
        assert_eq!(defaults.ceiling(ContextTier::Medium), 8_000);
        assert_eq!(defaults.ceiling(ContextTier::High), 16_000);
        assert_eq!(ContextTier::Medium.token_ceiling(), 8_000);

        let custom = TierCeilings {
            low: 1_000,
            medium: 2_000,
            high: 3_000,
        };
        assert_eq!(custom.ceiling(ContextTier::High), 3_000);
    }
}
