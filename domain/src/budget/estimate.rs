//! Pre-flight cost prediction.
//!
//! Deliberately conservative (overestimates): the predictions feed the
//! run-plan log line and budget telemetry, never a gating decision.

use crate::budget::router::TaskIntent;
use crate::core::model::Pricing;

struct ModeEstimate {
    base_input: u64,
    base_output: u64,
}

fn chat_estimate(mode: TaskIntent) -> ModeEstimate {
    match mode {
        TaskIntent::Quick => ModeEstimate {
            base_input: 1_500,
            base_output: 400,
        },
        TaskIntent::Standard => ModeEstimate {
            base_input: 3_000,
            base_output: 800,
        },
        TaskIntent::Research => ModeEstimate {
            base_input: 5_000,
            base_output: 1_500,
        },
    }
}

// Per-member estimates for a council run
const COUNCIL_BASE_INPUT: u64 = 2_000;
const COUNCIL_BASE_OUTPUT: u64 = 600;

fn call_cost(pricing: &Pricing, input_tokens: u64, output_tokens: u64) -> f64 {
    (input_tokens as f64 / 1_000_000.0) * pricing.input
        + (output_tokens as f64 / 1_000_000.0) * pricing.output
}

/// Estimate the cost of a chat-pipeline turn.
pub fn estimate_chat_cost(mode: TaskIntent, context_tokens: usize, chairman: &Pricing) -> f64 {
    let estimate = chat_estimate(mode);
    call_cost(
        chairman,
        estimate.base_input + context_tokens as u64,
        estimate.base_output,
    )
}

/// Estimate the cost of a full council run.
///
/// Stage 2 input grows with the council size (every anonymized answer is
/// in the ranking prompt); stage 3 sees both the answers and the rankings.
pub fn estimate_council_cost(council: &[Pricing], chairman: &Pricing) -> f64 {
    let mut total = 0.0;

    // Stage 1: each member answers
    for pricing in council {
        total += call_cost(pricing, COUNCIL_BASE_INPUT, COUNCIL_BASE_OUTPUT);
    }

    // Stage 2: each member ranks all answers
    let stage2_input = COUNCIL_BASE_INPUT + COUNCIL_BASE_OUTPUT * council.len() as u64;
    for pricing in council {
        total += call_cost(pricing, stage2_input, COUNCIL_BASE_OUTPUT);
    }

    // Stage 3: chairman reads answers + rankings
    total += call_cost(chairman, stage2_input * 2, COUNCIL_BASE_OUTPUT * 2);

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_cost_scales_with_mode() {
        let pricing = Pricing::new(1.0, 5.0);
        let quick = estimate_chat_cost(TaskIntent::Quick, 0, &pricing);
        let research = estimate_chat_cost(TaskIntent::Research, 0, &pricing);
        assert!(research > quick);
    }

    #[test]
    fn test_chat_cost_includes_context_tokens() {
        let pricing = Pricing::new(1.0, 5.0);
        let bare = estimate_chat_cost(TaskIntent::Standard, 0, &pricing);
        let with_context = estimate_chat_cost(TaskIntent::Standard, 8_000, &pricing);
        assert!(with_context > bare);
    }

    #[test]
    fn test_council_cost_grows_with_members() {
        let member = Pricing::new(1.0, 5.0);
        let chairman = Pricing::new(2.0, 10.0);
        let three = estimate_council_cost(&[member; 3], &chairman);
        let five = estimate_council_cost(&[member; 5], &chairman);
        assert!(five > three);
        assert!(three > 0.0);
    }

    #[test]
    fn test_free_models_cost_nothing() {
        let free = Pricing::free();
        assert_eq!(estimate_council_cost(&[free; 4], &free), 0.0);
    }
}
