//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("No council members configured")]
    NoCouncilMembers,

    #[error("All council members failed to respond")]
    AllMembersFailed,

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Invalid turn state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Orchestration error: {0}")]
    OrchestrationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DomainError::AllMembersFailed;
        assert_eq!(error.to_string(), "All council members failed to respond");
    }

    #[test]
    fn test_transition_error_names_states() {
        let error = DomainError::InvalidTransition {
            from: "IDLE".to_string(),
            to: "STAGE2_RUNNING".to_string(),
        };
        assert!(error.to_string().contains("IDLE"));
        assert!(error.to_string().contains("STAGE2_RUNNING"));
    }
}
