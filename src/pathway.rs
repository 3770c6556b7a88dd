// 🛤️ Pathways - Four fixed tracks with ordered milestones
//
// The tracker itself is stateless: progress lives in each GenerativeUnit's
// pathway_progress map. This module owns the milestone sets, validation and
// next-milestone selection.

use crate::error::{TrustError, TrustResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PATHWAY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Pathway {
    /// Finding and securing employment
    Job,

    /// Starting and growing a business
    Business,

    /// Software development career
    Developer,

    /// Creative work and commissions
    Creative,
}

const JOB_MILESTONES: [&str; 6] = [
    "resume_ready",
    "skills_verified",
    "applications_sent",
    "interviews_completed",
    "offers_received",
    "employment_secured",
];

const BUSINESS_MILESTONES: [&str; 6] = [
    "business_plan",
    "entity_registered",
    "funding_secured",
    "first_customer",
    "revenue_generated",
    "business_sustainable",
];

const DEVELOPER_MILESTONES: [&str; 6] = [
    "skills_assessed",
    "environment_setup",
    "first_project",
    "portfolio_built",
    "code_reviewed",
    "production_deployed",
];

const CREATIVE_MILESTONES: [&str; 6] = [
    "portfolio_created",
    "work_published",
    "audience_built",
    "first_commission",
    "income_established",
    "brand_recognized",
];

impl Pathway {
    pub const ALL: [Pathway; 4] = [
        Pathway::Job,
        Pathway::Business,
        Pathway::Developer,
        Pathway::Creative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pathway::Job => "JOB",
            Pathway::Business => "BUSINESS",
            Pathway::Developer => "DEVELOPER",
            Pathway::Creative => "CREATIVE",
        }
    }

    /// Milestones in completion order
    pub fn milestones(&self) -> &'static [&'static str] {
        match self {
            Pathway::Job => &JOB_MILESTONES,
            Pathway::Business => &BUSINESS_MILESTONES,
            Pathway::Developer => &DEVELOPER_MILESTONES,
            Pathway::Creative => &CREATIVE_MILESTONES,
        }
    }

    pub fn is_milestone(&self, milestone: &str) -> bool {
        self.milestones().contains(&milestone)
    }

    /// Reject milestone names outside this pathway's fixed set
    pub fn validate_milestone(&self, milestone: &str) -> TrustResult<()> {
        if self.is_milestone(milestone) {
            Ok(())
        } else {
            Err(TrustError::InvalidMilestone {
                pathway: self.as_str().to_string(),
                milestone: milestone.to_string(),
            })
        }
    }

    /// All milestones at zero progress
    pub fn initial_progress(&self) -> BTreeMap<String, f64> {
        self.milestones()
            .iter()
            .map(|m| (m.to_string(), 0.0))
            .collect()
    }

    /// First milestone below 1.0 in pathway order; the last one when all are done
    pub fn next_milestone(&self, progress: &BTreeMap<String, f64>) -> &'static str {
        let milestones = self.milestones();
        milestones
            .iter()
            .find(|m| progress.get(**m).copied().unwrap_or(0.0) < 1.0)
            .copied()
            .unwrap_or(milestones[milestones.len() - 1])
    }

    /// Number of milestones at full completion
    pub fn completed_count(&self, progress: &BTreeMap<String, f64>) -> usize {
        self.milestones()
            .iter()
            .filter(|m| progress.get(**m).copied().unwrap_or(0.0) >= 1.0)
            .count()
    }

    /// Mean completion across all milestones of this pathway
    pub fn overall_progress(&self, progress: &BTreeMap<String, f64>) -> f64 {
        let milestones = self.milestones();
        let total: f64 = milestones
            .iter()
            .map(|m| progress.get(*m).copied().unwrap_or(0.0))
            .sum();
        total / milestones.len() as f64
    }
}

impl fmt::Display for Pathway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pathway {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "JOB" => Ok(Pathway::Job),
            "BUSINESS" => Ok(Pathway::Business),
            "DEVELOPER" => Ok(Pathway::Developer),
            "CREATIVE" => Ok(Pathway::Creative),
            _ => Err(TrustError::UnknownPathway(s.to_string())),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pathway_has_six_milestones() {
        for pathway in Pathway::ALL {
            assert_eq!(pathway.milestones().len(), 6);
            assert_eq!(pathway.initial_progress().len(), 6);
        }
    }

    #[test]
    fn test_milestone_validation() {
        assert!(Pathway::Job.validate_milestone("resume_ready").is_ok());
        assert!(Pathway::Job.validate_milestone("first_customer").is_err());

        let err = Pathway::Creative.validate_milestone("nope").unwrap_err();
        assert!(matches!(err, TrustError::InvalidMilestone { .. }));
    }

    #[test]
    fn test_next_milestone_order() {
        let pathway = Pathway::Job;
        let mut progress = pathway.initial_progress();
        assert_eq!(pathway.next_milestone(&progress), "resume_ready");

        progress.insert("resume_ready".to_string(), 1.0);
        progress.insert("applications_sent".to_string(), 1.0);
        assert_eq!(pathway.next_milestone(&progress), "skills_verified");

        for m in pathway.milestones() {
            progress.insert(m.to_string(), 1.0);
        }
        assert_eq!(pathway.next_milestone(&progress), "employment_secured");
        assert_eq!(pathway.completed_count(&progress), 6);
        assert!((pathway.overall_progress(&progress) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_pathway() {
        assert_eq!("job".parse::<Pathway>().unwrap(), Pathway::Job);
        assert_eq!(" Developer ".parse::<Pathway>().unwrap(), Pathway::Developer);
        assert!("ARTIST".parse::<Pathway>().is_err());
    }
}
