//! Session budget policy: optional cap, cumulative spend, notifications.
//!
//! Spend only ever increases. Breaching the budget never rejects a
//! request; the router degrades context size and model tier instead.

use serde::{Deserialize, Serialize};

/// Budget policy attached to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBudgetPolicy {
    /// Optional budget cap in USD; `None` means unconstrained.
    pub budget_usd: Option<f64>,
    /// Cumulative spend in USD, additive only.
    #[serde(default)]
    pub spent_usd: f64,
    /// Spend-ratio thresholds that trigger a notification, ascending.
    pub notify_thresholds: Vec<f64>,
    /// Thresholds already notified (so each fires once).
    #[serde(default)]
    notified: Vec<f64>,
}

impl SessionBudgetPolicy {
    pub fn new(budget_usd: Option<f64>) -> Self {
        Self {
            budget_usd,
            spent_usd: 0.0,
            notify_thresholds: vec![0.70, 0.85, 1.00],
            notified: Vec::new(),
        }
    }

    /// No budget cap.
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn with_thresholds(mut self, thresholds: Vec<f64>) -> Self {
        self.notify_thresholds = thresholds;
        self
    }

    /// Fraction of the budget spent, `None` when unconstrained.
    pub fn spend_ratio(&self) -> Option<f64> {
        match self.budget_usd {
            Some(budget) if budget > 0.0 => Some(self.spent_usd / budget),
            _ => None,
        }
    }

    /// Record additional spend and return thresholds newly crossed.
    ///
    /// Each threshold fires at most once over the life of the policy.
    pub fn record_spend(&mut self, delta_usd: f64) -> Vec<f64> {
        debug_assert!(delta_usd >= 0.0);
        self.spent_usd += delta_usd.max(0.0);

        let Some(ratio) = self.spend_ratio() else {
            return Vec::new();
        };

        let crossed: Vec<f64> = self
            .notify_thresholds
            .iter()
            .copied()
            .filter(|t| ratio >= *t && !self.notified.contains(t))
            .collect();
        self.notified.extend(crossed.iter().copied());
        crossed
    }
}

impl Default for SessionBudgetPolicy {
    fn default() -> Self {
        Self::unlimited()
    }
}
