//! Validation-result sink.
//!
//! Callers receive rejections through [`ValidationSink`], which separates failures that make a
//! block or transaction consensus-invalid from ones that are only discarded locally.

/// Receives the outcome of a failed check.
pub trait ValidationSink {
    /// The object is invalid under consensus rules. `dos_score` is the misbehavior score charged
    /// to the peer that relayed it.
    fn invalid(&mut self, dos_score: u32, reason: &str);

    /// The object is valid but was not accepted locally (policy, resource limits).
    fn discard(&mut self, reason: &str);
}

/// Recorded result of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidationState {
    #[default]
    Valid,
    Invalid { dos_score: u32, reason: String },
    Discarded { reason: String },
}

impl ValidationState {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationState::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationState::Invalid { .. })
    }

    pub fn dos_score(&self) -> u32 {
        match self {
            ValidationState::Invalid { dos_score, .. } => *dos_score,
            _ => 0,
        }
    }
}

impl ValidationSink for ValidationState {
    fn invalid(&mut self, dos_score: u32, reason: &str) {
        *self = ValidationState::Invalid {
            dos_score,
            reason: reason.to_string(),
        };
    }

    fn discard(&mut self, reason: &str) {
        *self = ValidationState::Discarded {
            reason: reason.to_string(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuxPowError, MerkleTree};

    #[test]
    fn test_aux_pow_error_is_invalid() {
        let mut state = ValidationState::default();
        assert!(state.is_valid());

        AuxPowError::CommitmentMismatch(MerkleTree::Chain).report(&mut state);
        assert!(state.is_invalid());
        assert_eq!(state.dos_score(), 100);
    }

    #[test]
    fn test_discard_has_no_score() {
        let mut state = ValidationState::default();
        state.discard("mempool full");
        assert!(!state.is_valid());
        assert!(!state.is_invalid());
        assert_eq!(state.dos_score(), 0);
    }
}
