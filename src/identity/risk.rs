// ⚖️ Risk Profile - Four component risks, one weighted total
//
// A snapshot, never stored on its own: always derivable from the identity.
// Financial risk is a neutral constant; no transaction signal reaches
// this core.

use crate::alerts::{AlertSeverity, VisualAlert};
use crate::identity::security::SecurityIdentity;
use crate::policy::{
    ACCESSIBILITY_RISK_WEIGHT, CRITICAL_RISK_THRESHOLD, FINANCIAL_RISK_WEIGHT,
    FULL_VERIFICATION_COUNT, IDENTITY_RISK_WEIGHT, NEUTRAL_FINANCIAL_RISK,
    NON_COMPLIANT_ACCESSIBILITY_RISK, OPERATIONAL_RISK_WEIGHT, RECOMMENDED_VERIFICATIONS,
    RESISTANCE_TEST_RATIO, TRUST_SCORE_CEILING,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Unverified identity risk, 1.0 with no verifications
    pub identity_risk: f64,
    pub financial_risk: f64,

    /// 1 - interaction ratio
    pub operational_risk: f64,
    pub accessibility_risk: f64,

    /// Weighted sum of the four, in [0, 1]
    pub overall_risk: f64,

    /// 1 - score/21; negative once the score passes 21
    pub fibonacci_retracement: f64,

    pub support_breached: bool,
    pub resistance_tested: bool,

    pub recommendations: Vec<String>,
    pub alerts: Vec<VisualAlert>,
}

/// Weighted combination of the component risks
pub fn overall_risk(identity: f64, financial: f64, operational: f64, accessibility: f64) -> f64 {
    IDENTITY_RISK_WEIGHT * identity
        + FINANCIAL_RISK_WEIGHT * financial
        + OPERATIONAL_RISK_WEIGHT * operational
        + ACCESSIBILITY_RISK_WEIGHT * accessibility
}

impl RiskProfile {
    pub fn assess(identity: &SecurityIdentity) -> Self {
        let identity_risk =
            (1.0 - identity.verification_count as f64 / FULL_VERIFICATION_COUNT).max(0.0);
        let financial_risk = NEUTRAL_FINANCIAL_RISK;
        let operational_risk = 1.0 - identity.interaction_ratio();
        let accessibility_risk = if identity.deaf_first_compliance {
            0.0
        } else {
            NON_COMPLIANT_ACCESSIBILITY_RISK
        };

        let overall = overall_risk(
            identity_risk,
            financial_risk,
            operational_risk,
            accessibility_risk,
        );

        let score = identity.fibonacci_score;
        let support_breached = score < identity.support_level as f64;
        let resistance_tested = score >= RESISTANCE_TEST_RATIO * identity.resistance_level as f64;

        let mut recommendations = Vec::new();
        if identity.verification_count < RECOMMENDED_VERIFICATIONS {
            recommendations.push(format!(
                "Complete at least {} identity verifications ({} so far)",
                RECOMMENDED_VERIFICATIONS, identity.verification_count
            ));
        }
        if !identity.deaf_first_compliance {
            recommendations
                .push("Enable deaf-first accessibility: captions, visual alerts, haptics".to_string());
        }
        if identity.badges.is_empty() {
            recommendations.push("Earn a security badge to strengthen trust".to_string());
        }

        let mut alerts = Vec::new();
        if resistance_tested {
            alerts.push(VisualAlert::new(
                AlertSeverity::Info,
                "Resistance being tested",
                &format!(
                    "Score {:.2} is within reach of the next threshold {}",
                    score, identity.resistance_level
                ),
            ));
        }
        if support_breached {
            alerts.push(VisualAlert::new(
                AlertSeverity::Caution,
                "Support breached",
                &format!(
                    "Score {:.2} fell below support level {}",
                    score, identity.support_level
                ),
            ));
        }
        if overall > CRITICAL_RISK_THRESHOLD {
            alerts.push(
                VisualAlert::new(
                    AlertSeverity::Critical,
                    "High overall risk",
                    &format!(
                        "Overall risk {:.1}% exceeds {:.1}%",
                        overall * 100.0,
                        CRITICAL_RISK_THRESHOLD * 100.0
                    ),
                )
                .with_threshold(CRITICAL_RISK_THRESHOLD),
            );
        }

        RiskProfile {
            identity_risk,
            financial_risk,
            operational_risk,
            accessibility_risk,
            overall_risk: overall,
            fibonacci_retracement: 1.0 - score / TRUST_SCORE_CEILING,
            support_breached,
            resistance_tested,
            recommendations,
            alerts,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.overall_risk > CRITICAL_RISK_THRESHOLD
    }
}
