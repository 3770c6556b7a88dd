// 📐 Policy Constants - Every threshold and weight in one place
//
// Business rules carried over as-is. Change them here, nowhere else.

/// The golden ratio, used as the cap for golden ratio scores
pub const GOLDEN_RATIO: f64 = 1.618;

// ============================================================================
// RETRACEMENT / EXTENSION FRACTIONS
// ============================================================================

/// Fractions for retracement levels (0% .. 100%)
pub const RETRACEMENT_FRACTIONS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Fractions for extension levels (100% .. 423.6%)
pub const EXTENSION_FRACTIONS: [f64; 4] = [1.0, 1.618, 2.618, 4.236];

// ============================================================================
// CONSUMPTION PROTECTION GATES
// ============================================================================

/// Informational notice once 38.2% of an allocation is consumed
pub const INFO_THRESHOLD: f64 = 0.382;

/// Caution once half the allocation is consumed
pub const CAUTION_THRESHOLD: f64 = 0.5;

/// Critical decision point
pub const CRITICAL_THRESHOLD: f64 = 0.618;

/// Hard block: no consumption may bring the ratio to or past this point
pub const BLOCK_THRESHOLD: f64 = 0.786;

// ============================================================================
// SECURITY IDENTITY SCORING
// ============================================================================

/// Verifications beyond this count add nothing to the score
pub const MAX_SCORED_VERIFICATIONS: u32 = 8;

/// Multiplier applied to the golden-ratio-scaled interaction ratio
pub const INTERACTION_WEIGHT: f64 = 5.0;

/// Score contributed by a perfect accessibility score
pub const ACCESSIBILITY_WEIGHT: f64 = 8.0;

/// Points per badge, and the cap on the badge contribution
pub const POINTS_PER_BADGE: f64 = 2.0;
pub const BADGE_SCORE_CAP: f64 = 13.0;

/// Account age term: min(log2(days + 1) * weight, cap)
pub const ACCOUNT_AGE_WEIGHT: f64 = 0.5;
pub const ACCOUNT_AGE_CAP: f64 = 5.0;

/// Score at which trust reaches 100%
pub const TRUST_SCORE_CEILING: f64 = 21.0;

/// Score assigned to a freshly created identity
pub const INITIAL_FIBONACCI_SCORE: f64 = 1.0;

/// Default accessibility score for new identities (full accessibility assumed)
pub const DEFAULT_ACCESSIBILITY_SCORE: f64 = 100.0;

/// Upper bounds (exclusive) for SEED .. RADIANT; anything above is LEGENDARY
pub const SECURITY_LEVEL_BOUNDS: [f64; 7] = [1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0];

// ============================================================================
// RISK PROFILE
// ============================================================================

pub const IDENTITY_RISK_WEIGHT: f64 = 0.382;
pub const FINANCIAL_RISK_WEIGHT: f64 = 0.236;
pub const OPERATIONAL_RISK_WEIGHT: f64 = 0.236;
pub const ACCESSIBILITY_RISK_WEIGHT: f64 = 0.146;

/// Verifications needed to bring identity risk to zero
pub const FULL_VERIFICATION_COUNT: f64 = 5.0;

/// Neutral financial risk; no transaction signal reaches this core
pub const NEUTRAL_FINANCIAL_RISK: f64 = 0.5;

/// Accessibility risk when deaf-first compliance is missing
pub const NON_COMPLIANT_ACCESSIBILITY_RISK: f64 = 0.5;

/// Overall risk above this triggers a critical alert
pub const CRITICAL_RISK_THRESHOLD: f64 = 0.618;

/// Resistance counts as "tested" once the score reaches this share of it
pub const RESISTANCE_TEST_RATIO: f64 = 0.9;

/// Fewer verifications than this produce a recommendation
pub const RECOMMENDED_VERIFICATIONS: u32 = 3;
