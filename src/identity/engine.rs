// ⚙️ Security Identity Engine - Records activity, recomputes, reports alerts
//
// Holds identities in an explicit in-memory store. Callers own the engine
// (one per run or test); the persistence collaborator hands stored records
// back through `restore`.

use crate::alerts::{AlertSeverity, VisualAlert};
use crate::badges::{BadgeTemplate, CertificationTemplate};
use crate::error::{TrustError, TrustResult};
use crate::identity::security::{InteractionType, SecurityIdentity, SecurityLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Signals reported for one identity; each applies at most once per report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityReport {
    pub verification_added: bool,
    pub interaction_type: Option<InteractionType>,
    pub badge_earned: Option<BadgeTemplate>,
    pub certification_added: Option<CertificationTemplate>,
}

impl ActivityReport {
    pub fn verification() -> Self {
        ActivityReport {
            verification_added: true,
            ..Default::default()
        }
    }

    pub fn interaction(interaction_type: InteractionType) -> Self {
        ActivityReport {
            interaction_type: Some(interaction_type),
            ..Default::default()
        }
    }

    pub fn badge(template: BadgeTemplate) -> Self {
        ActivityReport {
            badge_earned: Some(template),
            ..Default::default()
        }
    }

    pub fn certification(template: CertificationTemplate) -> Self {
        ActivityReport {
            certification_added: Some(template),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.verification_added
            && self.interaction_type.is_none()
            && self.badge_earned.is_none()
            && self.certification_added.is_none()
    }
}

/// Result of recording activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityOutcome {
    /// Identity after recomputation
    pub identity: SecurityIdentity,

    pub previous_level: SecurityLevel,
    pub level_changed: bool,

    /// Level change and risk alerts, ascending by severity
    pub alerts: Vec<VisualAlert>,
}

#[derive(Debug, Default)]
pub struct SecurityIdentityEngine {
    identities: HashMap<String, SecurityIdentity>,
}

impl SecurityIdentityEngine {
    pub fn new() -> Self {
        SecurityIdentityEngine {
            identities: HashMap::new(),
        }
    }

    pub fn create(&mut self, entity_id: &str, entity_type: &str) -> SecurityIdentity {
        let identity = SecurityIdentity::new(entity_id, entity_type);
        info!(identity_id = %identity.id, entity_id, entity_type, "Security identity created");
        self.identities.insert(identity.id.clone(), identity.clone());
        identity
    }

    /// Apply the report's signals, then recompute every derived field
    pub fn record_activity(
        &mut self,
        identity_id: &str,
        report: ActivityReport,
    ) -> TrustResult<ActivityOutcome> {
        let now = Utc::now();
        self.mutate(identity_id, now, |identity| {
            if report.verification_added {
                identity.verification_count += 1;
            }
            if let Some(interaction) = report.interaction_type {
                identity.total_interactions += 1;
                if interaction.is_positive() {
                    identity.positive_interactions += 1;
                }
            }
            if let Some(template) = &report.badge_earned {
                let badge = template.award(now);
                info!(identity_id = %identity.id, badge = %badge.name, "Badge awarded");
                identity.badges.push(badge);
            }
            if let Some(template) = &report.certification_added {
                let certification = template.issue(now);
                info!(
                    identity_id = %identity.id,
                    certification = %certification.name,
                    "Certification issued"
                );
                identity.certifications.push(certification);
            }
        })
    }

    /// Award a catalog badge and recompute
    pub fn award_badge(
        &mut self,
        identity_id: &str,
        template: BadgeTemplate,
    ) -> TrustResult<ActivityOutcome> {
        self.record_activity(identity_id, ActivityReport::badge(template))
    }

    /// Issue a certification and recompute
    pub fn issue_certification(
        &mut self,
        identity_id: &str,
        template: CertificationTemplate,
    ) -> TrustResult<ActivityOutcome> {
        self.record_activity(identity_id, ActivityReport::certification(template))
    }

    /// Update accessibility signals (score clamped to 0 - 100) and recompute
    pub fn update_accessibility(
        &mut self,
        identity_id: &str,
        accessibility_score: f64,
        deaf_first_compliance: bool,
    ) -> TrustResult<ActivityOutcome> {
        let now = Utc::now();
        let score = if accessibility_score.is_nan() {
            0.0
        } else {
            accessibility_score.clamp(0.0, 100.0)
        };
        self.mutate(identity_id, now, |identity| {
            identity.accessibility_score = score;
            identity.deaf_first_compliance = deaf_first_compliance;
        })
    }

    fn mutate<F>(
        &mut self,
        identity_id: &str,
        now: DateTime<Utc>,
        apply: F,
    ) -> TrustResult<ActivityOutcome>
    where
        F: FnOnce(&mut SecurityIdentity),
    {
        let identity = self
            .identities
            .get_mut(identity_id)
            .ok_or_else(|| TrustError::identity_not_found(identity_id))?;

        let previous_level = identity.security_level;
        apply(identity);
        identity.recompute(now);

        let level = identity.security_level;
        let mut alerts = Vec::new();
        if level > previous_level {
            info!(
                identity_id,
                from = previous_level.as_str(),
                to = level.as_str(),
                "Security level advanced"
            );
            alerts.push(VisualAlert::new(
                AlertSeverity::Success,
                "Security level advanced",
                &format!("{} -> {}", previous_level.as_str(), level.as_str()),
            ));
        } else if level < previous_level {
            info!(
                identity_id,
                from = previous_level.as_str(),
                to = level.as_str(),
                "Security level dropped"
            );
            alerts.push(VisualAlert::new(
                AlertSeverity::Caution,
                "Security level dropped",
                &format!("{} -> {}", previous_level.as_str(), level.as_str()),
            ));
        }
        alerts.extend(identity.risk_profile.alerts.iter().cloned());
        alerts.sort_by_key(|a| a.severity);

        debug!(
            identity_id,
            score = identity.fibonacci_score,
            trust = identity.trust_score,
            overall_risk = identity.risk_profile.overall_risk,
            "Identity recomputed"
        );

        Ok(ActivityOutcome {
            identity: identity.clone(),
            previous_level,
            level_changed: level != previous_level,
            alerts,
        })
    }

    pub fn get(&self, identity_id: &str) -> Option<&SecurityIdentity> {
        self.identities.get(identity_id)
    }

    pub fn find_by_entity(&self, entity_id: &str) -> Option<&SecurityIdentity> {
        self.identities.values().find(|i| i.entity_id == entity_id)
    }

    /// All identities, ordered by creation time
    pub fn all_identities(&self) -> Vec<&SecurityIdentity> {
        let mut identities: Vec<&SecurityIdentity> = self.identities.values().collect();
        identities.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        identities
    }

    /// Re-insert a record handed back by the persistence collaborator
    pub fn restore(&mut self, identity: SecurityIdentity) {
        self.identities.insert(identity.id.clone(), identity);
    }

    pub fn count(&self) -> usize {
        self.identities.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================
