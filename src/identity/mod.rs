// Security Identity - scoring, levels, risk
//
// Each identity has:
// - Stable identity (UUID) that NEVER changes
// - Recorded signals (verifications, interactions, badges, accessibility)
// - Derived values recomputed from those signals on every activity

pub mod engine;
pub mod risk;
pub mod security;

pub use engine::{ActivityOutcome, ActivityReport, SecurityIdentityEngine};
pub use risk::{overall_risk, RiskProfile};
pub use security::{InteractionType, SecurityIdentity, SecurityLevel};
