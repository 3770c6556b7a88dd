// 🏅 Badge & Certification Registry - Static catalog + awarded instances
//
// Templates describe what can be awarded. Awarding stamps an id and a
// timestamp onto a copy; the awarded record never changes afterwards.
// There is no revocation.

use crate::error::{TrustError, TrustResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// BADGE LEVEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BadgeLevel {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl BadgeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeLevel::Bronze => "Bronze",
            BadgeLevel::Silver => "Silver",
            BadgeLevel::Gold => "Gold",
            BadgeLevel::Platinum => "Platinum",
        }
    }
}

// ============================================================================
// TEMPLATES
// ============================================================================

/// Awardable badge, minus id and award timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeTemplate {
    pub name: String,
    pub issuer: String,
    pub level: BadgeLevel,
    pub description: String,

    /// None = never expires
    pub validity_days: Option<u32>,
}

impl BadgeTemplate {
    /// Stamp a new awarded badge
    pub fn award(&self, awarded_at: DateTime<Utc>) -> SecurityBadge {
        SecurityBadge {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name.clone(),
            issuer: self.issuer.clone(),
            level: self.level,
            description: self.description.clone(),
            awarded_at,
            expires_at: self
                .validity_days
                .map(|days| awarded_at + Duration::days(days as i64)),
        }
    }
}

/// Issuable certification, minus id and issue timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationTemplate {
    pub name: String,
    pub issuer: String,

    /// Standard certified against (e.g. "WCAG 2.1 AA")
    pub standard: String,

    pub validity_days: Option<u32>,
}

impl CertificationTemplate {
    pub fn issue(&self, issued_at: DateTime<Utc>) -> Certification {
        Certification {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name.clone(),
            issuer: self.issuer.clone(),
            standard: self.standard.clone(),
            issued_at,
            expires_at: self
                .validity_days
                .map(|days| issued_at + Duration::days(days as i64)),
        }
    }
}

// ============================================================================
// AWARDED RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityBadge {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub level: BadgeLevel,
    pub description: String,
    pub awarded_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SecurityBadge {
    pub fn is_valid_at(&self, time: DateTime<Utc>) -> bool {
        self.awarded_at <= time && self.expires_at.map_or(true, |until| until > time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub standard: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Certification {
    pub fn is_valid_at(&self, time: DateTime<Utc>) -> bool {
        self.issued_at <= time && self.expires_at.map_or(true, |until| until > time)
    }
}

// ============================================================================
// CATALOG
// ============================================================================

struct CatalogBadge {
    name: &'static str,
    issuer: &'static str,
    level: BadgeLevel,
    description: &'static str,
    validity_days: Option<u32>,
}

struct CatalogCertification {
    name: &'static str,
    issuer: &'static str,
    standard: &'static str,
    validity_days: Option<u32>,
}

const BADGE_CATALOG: [CatalogBadge; 5] = [
    CatalogBadge {
        name: "Identity Verified",
        issuer: "Identity Office",
        level: BadgeLevel::Bronze,
        description: "Completed primary identity verification",
        validity_days: Some(365),
    },
    CatalogBadge {
        name: "Deaf-First Champion",
        issuer: "Identity Office",
        level: BadgeLevel::Gold,
        description: "Maintains deaf-first accessibility across all interactions",
        validity_days: None,
    },
    CatalogBadge {
        name: "Accessibility Advocate",
        issuer: "Accessibility Council",
        level: BadgeLevel::Silver,
        description: "Contributed accessibility improvements to the community",
        validity_days: None,
    },
    CatalogBadge {
        name: "Security Guardian",
        issuer: "Trust Council",
        level: BadgeLevel::Gold,
        description: "Sustained high trust with no risk incidents",
        validity_days: Some(180),
    },
    CatalogBadge {
        name: "Community Trusted",
        issuer: "Trust Council",
        level: BadgeLevel::Platinum,
        description: "Consistently positive interactions across the network",
        validity_days: None,
    },
];

const CERTIFICATION_CATALOG: [CatalogCertification; 3] = [
    CatalogCertification {
        name: "WCAG Compliance",
        issuer: "W3C Accessibility Review",
        standard: "WCAG 2.1 AA",
        validity_days: Some(365),
    },
    CatalogCertification {
        name: "Section 508 Conformance",
        issuer: "Accessibility Board",
        standard: "Section 508",
        validity_days: Some(730),
    },
    CatalogCertification {
        name: "Information Security Management",
        issuer: "ISO",
        standard: "ISO/IEC 27001",
        validity_days: Some(1095),
    },
];

/// One entry of the awardable catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogEntry {
    Badge(BadgeTemplate),
    Certification(CertificationTemplate),
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        match self {
            CatalogEntry::Badge(b) => &b.name,
            CatalogEntry::Certification(c) => &c.name,
        }
    }
}

/// Read-only access to the fixed catalog
pub struct BadgeRegistry;

impl BadgeRegistry {
    pub fn badges() -> Vec<BadgeTemplate> {
        BADGE_CATALOG
            .iter()
            .map(|b| BadgeTemplate {
                name: b.name.to_string(),
                issuer: b.issuer.to_string(),
                level: b.level,
                description: b.description.to_string(),
                validity_days: b.validity_days,
            })
            .collect()
    }

    pub fn certifications() -> Vec<CertificationTemplate> {
        CERTIFICATION_CATALOG
            .iter()
            .map(|c| CertificationTemplate {
                name: c.name.to_string(),
                issuer: c.issuer.to_string(),
                standard: c.standard.to_string(),
                validity_days: c.validity_days,
            })
            .collect()
    }

    /// Badges first, then certifications, in catalog order
    pub fn list_available() -> Vec<CatalogEntry> {
        Self::badges()
            .into_iter()
            .map(CatalogEntry::Badge)
            .chain(Self::certifications().into_iter().map(CatalogEntry::Certification))
            .collect()
    }

    /// Badge template by name (case-insensitive)
    pub fn find_badge(name: &str) -> TrustResult<BadgeTemplate> {
        let lower = name.to_lowercase();
        Self::badges()
            .into_iter()
            .find(|b| b.name.to_lowercase() == lower)
            .ok_or_else(|| TrustError::UnknownTemplate(name.to_string()))
    }

    /// Certification template by name or standard (case-insensitive)
    pub fn find_certification(name: &str) -> TrustResult<CertificationTemplate> {
        let lower = name.to_lowercase();
        Self::certifications()
            .into_iter()
            .find(|c| c.name.to_lowercase() == lower || c.standard.to_lowercase() == lower)
            .ok_or_else(|| TrustError::UnknownTemplate(name.to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_available() {
        let catalog = BadgeRegistry::list_available();
        assert_eq!(catalog.len(), 8);
        assert!(matches!(catalog[0], CatalogEntry::Badge(_)));
        assert!(matches!(catalog[7], CatalogEntry::Certification(_)));
        assert_eq!(catalog[0].name(), "Identity Verified");
    }

    #[test]
    fn test_find_templates() {
        let badge = BadgeRegistry::find_badge("deaf-first champion").unwrap();
        assert_eq!(badge.level, BadgeLevel::Gold);

        let cert = BadgeRegistry::find_certification("WCAG 2.1 AA").unwrap();
        assert_eq!(cert.name, "WCAG Compliance");

        assert!(matches!(
            BadgeRegistry::find_badge("Moon Walker"),
            Err(TrustError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_award_stamps_id_and_expiry() {
        let template = BadgeRegistry::find_badge("Identity Verified").unwrap();
        let now = Utc::now();

        let first = template.award(now);
        let second = template.award(now);

        assert_ne!(first.id, second.id);
        assert_eq!(first.awarded_at, now);
        assert_eq!(first.expires_at, Some(now + Duration::days(365)));
        assert!(first.is_valid_at(now));
        assert!(!first.is_valid_at(now + Duration::days(366)));
    }

    #[test]
    fn test_issue_certification_without_expiry() {
        let template = CertificationTemplate {
            name: "Custom".to_string(),
            issuer: "Internal".to_string(),
            standard: "None".to_string(),
            validity_days: None,
        };
        let now = Utc::now();
        let cert = template.issue(now);

        assert!(cert.expires_at.is_none());
        assert!(cert.is_valid_at(now + Duration::days(10_000)));
    }
}
