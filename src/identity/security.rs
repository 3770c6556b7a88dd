// 🛡️ Security Identity - Signals in, bounded trust out
//
// "Counters are FACTS (only recorded), scores are DERIVED (always recomputed)"
//
// Every derived field (score, level, support/resistance, trust, risk) is a
// pure function of the counters, badges and account age. Levels are never
// sticky: a worse interaction ratio can drop an identity a level.

use crate::badges::{Certification, SecurityBadge};
use crate::fibonacci::{fibonacci_u, largest_fibonacci_at_most};
use crate::identity::risk::RiskProfile;
use crate::policy::{
    ACCESSIBILITY_WEIGHT, ACCOUNT_AGE_CAP, ACCOUNT_AGE_WEIGHT, BADGE_SCORE_CAP,
    DEFAULT_ACCESSIBILITY_SCORE, GOLDEN_RATIO, INITIAL_FIBONACCI_SCORE, INTERACTION_WEIGHT,
    MAX_SCORED_VERIFICATIONS, POINTS_PER_BADGE, SECURITY_LEVEL_BOUNDS, TRUST_SCORE_CEILING,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// SECURITY LEVEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityLevel {
    Seed,
    Sprout,
    Growing,
    Blooming,
    Thriving,
    Golden,
    Radiant,
    Legendary,
}

impl SecurityLevel {
    /// Ascending order, aligned with SECURITY_LEVEL_BOUNDS
    pub const ALL: [SecurityLevel; 8] = [
        SecurityLevel::Seed,
        SecurityLevel::Sprout,
        SecurityLevel::Growing,
        SecurityLevel::Blooming,
        SecurityLevel::Thriving,
        SecurityLevel::Golden,
        SecurityLevel::Radiant,
        SecurityLevel::Legendary,
    ];

    /// Step function over the Fibonacci score
    pub fn from_score(score: f64) -> Self {
        SECURITY_LEVEL_BOUNDS
            .iter()
            .position(|bound| score < *bound)
            .map(|i| Self::ALL[i])
            .unwrap_or(SecurityLevel::Legendary)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityLevel::Seed => "SEED",
            SecurityLevel::Sprout => "SPROUT",
            SecurityLevel::Growing => "GROWING",
            SecurityLevel::Blooming => "BLOOMING",
            SecurityLevel::Thriving => "THRIVING",
            SecurityLevel::Golden => "GOLDEN",
            SecurityLevel::Radiant => "RADIANT",
            SecurityLevel::Legendary => "LEGENDARY",
        }
    }
}

// ============================================================================
// INTERACTIONS / ACTIVITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    Positive,
    Neutral,
    Negative,
}

impl InteractionType {
    pub fn is_positive(&self) -> bool {
        matches!(self, InteractionType::Positive)
    }
}

// ============================================================================
// SECURITY IDENTITY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityIdentity {
    /// Stable identity (UUID)
    pub id: String,

    pub entity_id: String,
    pub entity_type: String,

    // ========================================================================
    // DERIVED (recomputed on every activity)
    // ========================================================================
    pub security_level: SecurityLevel,
    pub fibonacci_score: f64,

    /// Fibonacci number one index below the score's position
    pub support_level: u64,

    /// Fibonacci number one index above the score's position
    pub resistance_level: u64,

    /// 0 - 100
    pub trust_score: f64,

    pub risk_profile: RiskProfile,

    // ========================================================================
    // RECORDED SIGNALS
    // ========================================================================
    pub verification_count: u32,
    pub total_interactions: u32,
    pub positive_interactions: u32,

    /// 0 - 100
    pub accessibility_score: f64,
    pub deaf_first_compliance: bool,

    /// Append-only
    pub badges: Vec<SecurityBadge>,
    pub certifications: Vec<Certification>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecurityIdentity {
    /// Neutral identity: no signals, full accessibility assumed, score 1
    pub fn new(entity_id: &str, entity_type: &str) -> Self {
        let now = Utc::now();
        let mut identity = SecurityIdentity {
            id: uuid::Uuid::new_v4().to_string(),
            entity_id: entity_id.to_string(),
            entity_type: entity_type.to_string(),
            security_level: SecurityLevel::Seed,
            fibonacci_score: INITIAL_FIBONACCI_SCORE,
            support_level: 0,
            resistance_level: 0,
            trust_score: 0.0,
            risk_profile: RiskProfile::default(),
            verification_count: 0,
            total_interactions: 0,
            positive_interactions: 0,
            accessibility_score: DEFAULT_ACCESSIBILITY_SCORE,
            deaf_first_compliance: true,
            badges: Vec::new(),
            certifications: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        identity.apply_score(INITIAL_FIBONACCI_SCORE);
        // A new identity starts at SEED regardless of where score 1 would land
        identity.security_level = SecurityLevel::Seed;
        identity
    }

    /// positive / total, 0 without interactions
    pub fn interaction_ratio(&self) -> f64 {
        if self.total_interactions == 0 {
            return 0.0;
        }
        self.positive_interactions as f64 / self.total_interactions as f64
    }

    pub fn badge_count(&self) -> usize {
        self.badges.len()
    }

    pub fn account_age_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_days().max(0) as f64
    }

    /// Weighted sum of signal contributions, each bounded by a small Fibonacci number
    pub fn compute_fibonacci_score(&self, now: DateTime<Utc>) -> f64 {
        let scored_verifications = self.verification_count.min(MAX_SCORED_VERIFICATIONS) as usize;
        let verification_score: f64 = (0..scored_verifications)
            .map(|i| fibonacci_u(i + 1) as f64)
            .sum();

        let interaction_score = if self.total_interactions == 0 {
            0.0
        } else {
            self.interaction_ratio() * GOLDEN_RATIO * INTERACTION_WEIGHT
        };

        let accessibility_score = (self.accessibility_score / 100.0) * ACCESSIBILITY_WEIGHT;

        let badge_score = (self.badge_count() as f64 * POINTS_PER_BADGE).min(BADGE_SCORE_CAP);

        let age_score = ((self.account_age_days(now) + 1.0).log2() * ACCOUNT_AGE_WEIGHT)
            .min(ACCOUNT_AGE_CAP);

        verification_score + interaction_score + accessibility_score + badge_score + age_score
    }

    /// Recompute every derived field from the recorded signals
    pub fn recompute(&mut self, now: DateTime<Utc>) {
        let score = self.compute_fibonacci_score(now);
        self.apply_score(score);
        self.updated_at = now;
    }

    /// Derive level, support/resistance, trust and risk from a score
    fn apply_score(&mut self, score: f64) {
        self.fibonacci_score = score.max(0.0);
        self.security_level = SecurityLevel::from_score(self.fibonacci_score);

        let (_, index) = largest_fibonacci_at_most(self.fibonacci_score);
        self.support_level = fibonacci_u(index.saturating_sub(1));
        self.resistance_level = fibonacci_u(index + 1);

        self.trust_score = (self.fibonacci_score / TRUST_SCORE_CEILING * 100.0).min(100.0);

        let profile = RiskProfile::assess(self);
        self.risk_profile = profile;
    }
}

// ============================================================================
// TESTS
// ============================================================================
