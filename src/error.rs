// ⚠️ Error Taxonomy - Lookup and validation failures
//
// Blocked consumption is NOT an error: it comes back as a ConsumptionResult
// with blocked = true. Only integration faults (unknown ids, unknown names)
// surface here.

use thiserror::Error;

/// Errors returned by ledger, identity and registry operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrustError {
    /// A ledger entry or security identity id did not resolve
    #[error("{kind} not found: {id}")]
    EntryNotFound { kind: &'static str, id: String },

    /// Milestone name is not part of the pathway's fixed set
    #[error("invalid milestone '{milestone}' for pathway {pathway}")]
    InvalidMilestone { pathway: String, milestone: String },

    /// Pathway name could not be parsed
    #[error("unknown pathway: {0}")]
    UnknownPathway(String),

    /// No badge or certification template with this name in the catalog
    #[error("unknown catalog template: {0}")]
    UnknownTemplate(String),
}

impl TrustError {
    pub fn unit_not_found(id: &str) -> Self {
        TrustError::EntryNotFound {
            kind: "generative unit",
            id: id.to_string(),
        }
    }

    pub fn identity_not_found(id: &str) -> Self {
        TrustError::EntryNotFound {
            kind: "security identity",
            id: id.to_string(),
        }
    }
}

pub type TrustResult<T> = Result<T, TrustError>;
