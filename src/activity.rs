// 📥 Activity Replay - CSV activity log → ledger + identity engine
//
// One row per event:
//   entity_id, entity_type, kind, pathway, value, detail
//
// `value` carries the numeric or enumerated argument (units, progress,
// interaction type, accessibility score). `detail` carries the name
// (consumption reason, milestone, badge, certification, compliance flag).
// Missing units and identities are created on first use. A row that cannot
// be applied is rejected with a reason; the replay continues.

use crate::alerts::VisualAlert;
use crate::badges::BadgeRegistry;
use crate::cache::SnapshotCache;
use crate::error::TrustError;
use crate::identity::{
    ActivityOutcome, ActivityReport, InteractionType, SecurityIdentity, SecurityIdentityEngine,
};
use crate::ledger::{GenerativeUnit, ResourceLedger};
use crate::pathway::Pathway;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRow {
    pub entity_id: String,
    pub entity_type: String,
    pub kind: String,

    #[serde(default)]
    pub pathway: Option<String>,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Allocate,
    Consume,
    Milestone,
    Verification,
    Interaction,
    Badge,
    Certification,
    Accessibility,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Allocate => "allocate",
            ActivityKind::Consume => "consume",
            ActivityKind::Milestone => "milestone",
            ActivityKind::Verification => "verification",
            ActivityKind::Interaction => "interaction",
            ActivityKind::Badge => "badge",
            ActivityKind::Certification => "certification",
            ActivityKind::Accessibility => "accessibility",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = ActivityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allocate" => Ok(ActivityKind::Allocate),
            "consume" => Ok(ActivityKind::Consume),
            "milestone" => Ok(ActivityKind::Milestone),
            "verification" => Ok(ActivityKind::Verification),
            "interaction" => Ok(ActivityKind::Interaction),
            "badge" => Ok(ActivityKind::Badge),
            "certification" => Ok(ActivityKind::Certification),
            "accessibility" => Ok(ActivityKind::Accessibility),
            _ => Err(ActivityError::UnknownKind(s.to_string())),
        }
    }
}

/// Why a row was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActivityError {
    #[error("unknown activity kind: {0}")]
    UnknownKind(String),

    #[error("{kind} requires a {field}")]
    MissingField { kind: ActivityKind, field: &'static str },

    #[error("invalid {field} '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("{entity_id} already holds a {pathway} allocation")]
    AlreadyAllocated { entity_id: String, pathway: Pathway },

    #[error(transparent)]
    Engine(#[from] TrustError),
}

pub fn load_activity_csv(csv_path: &Path) -> Result<Vec<ActivityRow>> {
    let rdr = csv::Reader::from_path(csv_path).context("Failed to open activity CSV")?;
    collect_rows(rdr)
}

pub fn activity_from_reader<R: Read>(reader: R) -> Result<Vec<ActivityRow>> {
    collect_rows(csv::Reader::from_reader(reader))
}

fn collect_rows<R: Read>(mut rdr: csv::Reader<R>) -> Result<Vec<ActivityRow>> {
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: ActivityRow = result.context("Failed to deserialize activity row")?;
        rows.push(row);
    }
    Ok(rows)
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// What one applied row touched
#[derive(Debug, Clone, Serialize)]
pub struct RowOutcome {
    pub kind: ActivityKind,
    pub entity_id: String,

    /// "generative_unit" or "security_identity"
    pub record_kind: &'static str,
    pub record_id: String,

    pub blocked: bool,
    pub alerts: Vec<VisualAlert>,

    /// Payload for the audit event
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedRow {
    /// 1-based, header excluded
    pub row: usize,
    pub entity_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    pub rows_read: usize,
    pub rows_applied: usize,
    pub blocked_consumptions: usize,
    pub alerts_emitted: usize,
    pub units_created: usize,
    pub identities_created: usize,
    pub outcomes: Vec<RowOutcome>,
    pub rejected: Vec<RejectedRow>,
}

// ============================================================================
// REPLAY
// ============================================================================

pub struct ActivityReplay {
    pub ledger: ResourceLedger,
    pub engine: SecurityIdentityEngine,
    default_allocation: u64,
    unit_cache: SnapshotCache<GenerativeUnit>,
    identity_cache: SnapshotCache<SecurityIdentity>,
    units_created: usize,
    identities_created: usize,
}

impl ActivityReplay {
    pub fn new(default_allocation: u64, cache_ttl_secs: u64) -> Self {
        Self::with_state(
            ResourceLedger::new(),
            SecurityIdentityEngine::new(),
            default_allocation,
            cache_ttl_secs,
        )
    }

    /// Continue from previously persisted state
    pub fn with_state(
        ledger: ResourceLedger,
        engine: SecurityIdentityEngine,
        default_allocation: u64,
        cache_ttl_secs: u64,
    ) -> Self {
        ActivityReplay {
            ledger,
            engine,
            default_allocation,
            unit_cache: SnapshotCache::new(cache_ttl_secs),
            identity_cache: SnapshotCache::new(cache_ttl_secs),
            units_created: 0,
            identities_created: 0,
        }
    }

    /// Apply every row in order
    pub fn replay(&mut self, rows: &[ActivityRow]) -> ReplaySummary {
        let units_before = self.units_created;
        let identities_before = self.identities_created;
        let mut summary = ReplaySummary {
            rows_read: rows.len(),
            ..Default::default()
        };

        for (i, row) in rows.iter().enumerate() {
            match self.apply(row) {
                Ok(outcome) => {
                    summary.rows_applied += 1;
                    if outcome.blocked {
                        summary.blocked_consumptions += 1;
                    }
                    summary.alerts_emitted += outcome.alerts.len();
                    summary.outcomes.push(outcome);
                }
                Err(e) => {
                    warn!(row = i + 1, entity_id = %row.entity_id, error = %e, "Activity row rejected");
                    summary.rejected.push(RejectedRow {
                        row: i + 1,
                        entity_id: row.entity_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        summary.units_created = self.units_created - units_before;
        summary.identities_created = self.identities_created - identities_before;

        info!(
            rows = summary.rows_read,
            applied = summary.rows_applied,
            blocked = summary.blocked_consumptions,
            rejected = summary.rejected.len(),
            "Activity replay finished"
        );

        summary
    }

    pub fn apply(&mut self, row: &ActivityRow) -> Result<RowOutcome, ActivityError> {
        let kind: ActivityKind = row.kind.parse()?;
        debug!(entity_id = %row.entity_id, %kind, "Applying activity row");

        match kind {
            ActivityKind::Allocate => self.apply_allocate(kind, row),
            ActivityKind::Consume => self.apply_consume(kind, row),
            ActivityKind::Milestone => self.apply_milestone(kind, row),
            ActivityKind::Verification => {
                self.apply_identity(kind, row, |engine, id| {
                    engine.record_activity(id, ActivityReport::verification())
                })
            }
            ActivityKind::Interaction => {
                let interaction = parse_interaction(kind, row.value.as_deref())?;
                self.apply_identity(kind, row, |engine, id| {
                    engine.record_activity(id, ActivityReport::interaction(interaction))
                })
            }
            ActivityKind::Badge => {
                let name = required(kind, "detail", row.detail.as_deref())?;
                let template = BadgeRegistry::find_badge(name)?;
                self.apply_identity(kind, row, |engine, id| engine.award_badge(id, template))
            }
            ActivityKind::Certification => {
                let name = required(kind, "detail", row.detail.as_deref())?;
                let template = BadgeRegistry::find_certification(name)?;
                self.apply_identity(kind, row, |engine, id| {
                    engine.issue_certification(id, template)
                })
            }
            ActivityKind::Accessibility => {
                let score: f64 = parse_value(kind, "value", row.value.as_deref())?;
                let compliant = parse_compliance(row.detail.as_deref())?;
                self.apply_identity(kind, row, |engine, id| {
                    engine.update_accessibility(id, score, compliant)
                })
            }
        }
    }

    // ========================================================================
    // LEDGER ROWS
    // ========================================================================

    fn apply_allocate(
        &mut self,
        kind: ActivityKind,
        row: &ActivityRow,
    ) -> Result<RowOutcome, ActivityError> {
        let pathway = row_pathway(kind, row)?;
        let units: u64 = parse_value(kind, "value", row.value.as_deref())?;

        if self.ledger.find_by_entity(&row.entity_id, pathway).is_some() {
            return Err(ActivityError::AlreadyAllocated {
                entity_id: row.entity_id.clone(),
                pathway,
            });
        }

        let unit = self
            .ledger
            .create(&row.entity_id, &row.entity_type, pathway, units);
        self.units_created += 1;
        self.unit_cache.invalidate(&row.entity_id, pathway.as_str());

        Ok(RowOutcome {
            kind,
            entity_id: row.entity_id.clone(),
            record_kind: crate::db::GENERATIVE_UNIT_KIND,
            record_id: unit.id.clone(),
            blocked: false,
            alerts: Vec::new(),
            data: serde_json::json!({
                "pathway": pathway.as_str(),
                "allocated_units": unit.allocated_units,
                "fibonacci_level": unit.fibonacci_level,
            }),
        })
    }

    fn apply_consume(
        &mut self,
        kind: ActivityKind,
        row: &ActivityRow,
    ) -> Result<RowOutcome, ActivityError> {
        let pathway = row_pathway(kind, row)?;
        let amount: u64 = parse_value(kind, "value", row.value.as_deref())?;
        let reason = row.detail.as_deref().unwrap_or("activity");

        let unit_id = self.ensure_unit(row, pathway);
        let result = self.ledger.consume(&unit_id, amount, reason)?;
        self.unit_cache.invalidate(&row.entity_id, pathway.as_str());

        Ok(RowOutcome {
            kind,
            entity_id: row.entity_id.clone(),
            record_kind: crate::db::GENERATIVE_UNIT_KIND,
            record_id: unit_id,
            blocked: result.blocked,
            data: serde_json::json!({
                "pathway": pathway.as_str(),
                "amount": amount,
                "reason": reason,
                "success": result.success,
                "blocked": result.blocked,
                "projected_ratio": result.projected_ratio,
                "remaining_units": result.remaining_units,
            }),
            alerts: result.alerts,
        })
    }

    fn apply_milestone(
        &mut self,
        kind: ActivityKind,
        row: &ActivityRow,
    ) -> Result<RowOutcome, ActivityError> {
        let pathway = row_pathway(kind, row)?;
        let milestone = required(kind, "detail", row.detail.as_deref())?;
        let progress: f64 = match row.value.as_deref() {
            Some(v) if !v.trim().is_empty() => parse_value(kind, "value", Some(v))?,
            _ => 1.0,
        };
        pathway.validate_milestone(milestone)?;

        let unit_id = self.ensure_unit(row, pathway);
        let update = self
            .ledger
            .update_pathway_progress(&unit_id, milestone, progress)?;
        self.unit_cache.invalidate(&row.entity_id, pathway.as_str());

        Ok(RowOutcome {
            kind,
            entity_id: row.entity_id.clone(),
            record_kind: crate::db::GENERATIVE_UNIT_KIND,
            record_id: unit_id,
            blocked: false,
            data: serde_json::json!({
                "pathway": pathway.as_str(),
                "milestone": update.milestone,
                "progress": update.progress,
                "overall_progress": update.overall_progress,
                "reward_units": update.reward_units,
                "next_milestone": update.next_milestone,
            }),
            alerts: vec![update.alert],
        })
    }

    fn ensure_unit(&mut self, row: &ActivityRow, pathway: Pathway) -> String {
        if let Some(unit) = self.ledger.find_by_entity(&row.entity_id, pathway) {
            return unit.id.clone();
        }
        self.units_created += 1;
        self.ledger
            .create(&row.entity_id, &row.entity_type, pathway, self.default_allocation)
            .id
    }

    // ========================================================================
    // IDENTITY ROWS
    // ========================================================================

    fn apply_identity<F>(
        &mut self,
        kind: ActivityKind,
        row: &ActivityRow,
        record: F,
    ) -> Result<RowOutcome, ActivityError>
    where
        F: FnOnce(&mut SecurityIdentityEngine, &str) -> crate::error::TrustResult<ActivityOutcome>,
    {
        let identity_id = self.ensure_identity(row);
        let outcome = record(&mut self.engine, &identity_id)?;
        self.identity_cache
            .invalidate(&row.entity_id, &outcome.identity.entity_type);

        Ok(RowOutcome {
            kind,
            entity_id: row.entity_id.clone(),
            record_kind: crate::db::SECURITY_IDENTITY_KIND,
            record_id: identity_id,
            blocked: false,
            data: serde_json::json!({
                "value": row.value,
                "detail": row.detail,
                "security_level": outcome.identity.security_level.as_str(),
                "fibonacci_score": outcome.identity.fibonacci_score,
                "trust_score": outcome.identity.trust_score,
                "overall_risk": outcome.identity.risk_profile.overall_risk,
                "level_changed": outcome.level_changed,
            }),
            alerts: outcome.alerts,
        })
    }

    fn ensure_identity(&mut self, row: &ActivityRow) -> String {
        if let Some(identity) = self.engine.find_by_entity(&row.entity_id) {
            return identity.id.clone();
        }
        self.identities_created += 1;
        self.engine.create(&row.entity_id, &row.entity_type).id
    }

    // ========================================================================
    // CACHED LOOKUPS
    // ========================================================================

    /// Current unit for (entity, pathway), served from cache while fresh
    pub fn unit_snapshot(&mut self, entity_id: &str, pathway: Pathway) -> Option<GenerativeUnit> {
        if let Some(unit) = self.unit_cache.get(entity_id, pathway.as_str()) {
            return Some(unit);
        }
        let unit = self.ledger.find_by_entity(entity_id, pathway)?.clone();
        self.unit_cache.put(entity_id, pathway.as_str(), unit.clone());
        Some(unit)
    }

    /// Current identity for an entity, served from cache while fresh
    pub fn identity_snapshot(&mut self, entity_id: &str) -> Option<SecurityIdentity> {
        let identity = self.engine.find_by_entity(entity_id)?;
        let entity_type = identity.entity_type.clone();
        if let Some(cached) = self.identity_cache.get(entity_id, &entity_type) {
            return Some(cached);
        }
        let identity = identity.clone();
        self.identity_cache.put(entity_id, &entity_type, identity.clone());
        Some(identity)
    }
}

// ============================================================================
// FIELD PARSING
// ============================================================================

fn required<'a>(
    kind: ActivityKind,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ActivityError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ActivityError::MissingField { kind, field }),
    }
}

fn parse_value<T: FromStr>(
    kind: ActivityKind,
    field: &'static str,
    value: Option<&str>,
) -> Result<T, ActivityError> {
    let raw = required(kind, field, value)?;
    raw.parse().map_err(|_| ActivityError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

fn row_pathway(kind: ActivityKind, row: &ActivityRow) -> Result<Pathway, ActivityError> {
    let raw = required(kind, "pathway", row.pathway.as_deref())?;
    Ok(raw.parse()?)
}

fn parse_interaction(
    kind: ActivityKind,
    value: Option<&str>,
) -> Result<InteractionType, ActivityError> {
    let raw = required(kind, "value", value)?;
    match raw.to_lowercase().as_str() {
        "positive" => Ok(InteractionType::Positive),
        "neutral" => Ok(InteractionType::Neutral),
        "negative" => Ok(InteractionType::Negative),
        _ => Err(ActivityError::InvalidValue {
            field: "value",
            value: raw.to_string(),
        }),
    }
}

/// Empty detail keeps deaf-first compliance on
fn parse_compliance(detail: Option<&str>) -> Result<bool, ActivityError> {
    match detail.map(|d| d.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("compliant") | Some("true") => Ok(true),
        Some("non_compliant") | Some("false") => Ok(false),
        Some(other) => Err(ActivityError::InvalidValue {
            field: "detail",
            value: other.to_string(),
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SecurityLevel;

    const SAMPLE: &str = "\
entity_id,entity_type,kind,pathway,value,detail
user-1,individual,allocate,JOB,100,
user-1,individual,consume,JOB,40,training
user-1,individual,consume,JOB,15,tools
user-1,individual,consume,JOB,30,relocation
user-1,individual,milestone,JOB,1.0,resume_ready
user-1,individual,verification,,,
user-1,individual,interaction,,positive,
user-1,individual,badge,,,Identity Verified
user-1,individual,certification,,,WCAG Compliance
user-1,individual,teleport,,,
user-1,individual,milestone,JOB,0.5,moon_landing
";

    fn replay_sample() -> (ActivityReplay, ReplaySummary) {
        let rows = activity_from_reader(SAMPLE.as_bytes()).unwrap();
        let mut replay = ActivityReplay::new(1000, 300);
        let summary = replay.replay(&rows);
        (replay, summary)
    }

    #[test]
    fn test_parse_rows() {
        let rows = activity_from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 11);
        assert_eq!(rows[0].pathway.as_deref(), Some("JOB"));
        assert_eq!(rows[0].detail, None);
        assert_eq!(rows[5].pathway, None);
        assert_eq!(rows[7].detail.as_deref(), Some("Identity Verified"));
    }

    #[test]
    fn test_replay_summary() {
        let (_, summary) = replay_sample();

        assert_eq!(summary.rows_read, 11);
        assert_eq!(summary.rows_applied, 9);
        assert_eq!(summary.rejected.len(), 2);
        assert_eq!(summary.rejected[0].row, 10);
        assert!(summary.rejected[0].reason.contains("teleport"));
        assert!(summary.rejected[1].reason.contains("moon_landing"));
        assert_eq!(summary.blocked_consumptions, 1);
        assert_eq!(summary.units_created, 1);
        assert_eq!(summary.identities_created, 1);
        assert_eq!(
            summary.alerts_emitted,
            summary.outcomes.iter().map(|o| o.alerts.len()).sum::<usize>()
        );
    }

    #[test]
    fn test_replay_applies_ledger_rows() {
        let (mut replay, _) = replay_sample();

        // 40 + 15 committed, the 30 would reach 85% and is blocked
        let unit = replay.unit_snapshot("user-1", Pathway::Job).unwrap();
        assert_eq!(unit.allocated_units, 100);
        assert_eq!(unit.consumed_units, 55);
        assert_eq!(unit.remaining_units, 45);
        assert!(unit.is_locked());
        assert_eq!(unit.pathway_progress["resume_ready"], 1.0);
    }

    #[test]
    fn test_replay_applies_identity_rows() {
        let (mut replay, _) = replay_sample();

        let identity = replay.identity_snapshot("user-1").unwrap();
        assert_eq!(identity.verification_count, 1);
        assert_eq!(identity.total_interactions, 1);
        assert_eq!(identity.badges.len(), 1);
        assert_eq!(identity.certifications.len(), 1);
        assert!(identity.security_level > SecurityLevel::Seed);
    }

    #[test]
    fn test_consume_auto_creates_with_default_allocation() {
        let rows = activity_from_reader(
            "entity_id,entity_type,kind,pathway,value,detail\nbiz-9,business,consume,BUSINESS,100,permits\n"
                .as_bytes(),
        )
        .unwrap();
        let mut replay = ActivityReplay::new(1000, 300);
        let summary = replay.replay(&rows);

        assert_eq!(summary.units_created, 1);
        let unit = replay.unit_snapshot("biz-9", Pathway::Business).unwrap();
        assert_eq!(unit.allocated_units, 1000);
        assert_eq!(unit.remaining_units, 900);
        assert_eq!(unit.entity_type, "business");
    }

    #[test]
    fn test_invalid_rows_are_rejected() {
        let mut replay = ActivityReplay::new(100, 300);
        let row = |kind: &str, pathway: Option<&str>, value: Option<&str>, detail: Option<&str>| {
            ActivityRow {
                entity_id: "user-2".to_string(),
                entity_type: "individual".to_string(),
                kind: kind.to_string(),
                pathway: pathway.map(String::from),
                value: value.map(String::from),
                detail: detail.map(String::from),
            }
        };

        assert!(matches!(
            replay.apply(&row("consume", None, Some("5"), None)),
            Err(ActivityError::MissingField { field: "pathway", .. })
        ));
        assert!(matches!(
            replay.apply(&row("consume", Some("JOB"), Some("-5"), None)),
            Err(ActivityError::InvalidValue { .. })
        ));
        assert!(matches!(
            replay.apply(&row("consume", Some("ASTRONAUT"), Some("5"), None)),
            Err(ActivityError::Engine(TrustError::UnknownPathway(_)))
        ));
        assert!(matches!(
            replay.apply(&row("interaction", None, Some("ecstatic"), None)),
            Err(ActivityError::InvalidValue { .. })
        ));
        assert!(matches!(
            replay.apply(&row("badge", None, None, Some("Moon Walker"))),
            Err(ActivityError::Engine(TrustError::UnknownTemplate(_)))
        ));

        replay.apply(&row("allocate", Some("JOB"), Some("50"), None)).unwrap();
        assert!(matches!(
            replay.apply(&row("allocate", Some("JOB"), Some("50"), None)),
            Err(ActivityError::AlreadyAllocated { .. })
        ));
    }

    #[test]
    fn test_accessibility_row() {
        let mut replay = ActivityReplay::new(100, 300);
        let row = ActivityRow {
            entity_id: "user-3".to_string(),
            entity_type: "individual".to_string(),
            kind: "accessibility".to_string(),
            pathway: None,
            value: Some("50".to_string()),
            detail: Some("non_compliant".to_string()),
        };
        replay.apply(&row).unwrap();

        let identity = replay.identity_snapshot("user-3").unwrap();
        assert_eq!(identity.accessibility_score, 50.0);
        assert!(!identity.deaf_first_compliance);
        assert_eq!(identity.risk_profile.accessibility_risk, 0.5);
    }

    #[test]
    fn test_cache_invalidated_after_mutation() {
        let mut replay = ActivityReplay::new(100, 300);
        let consume = ActivityRow {
            entity_id: "user-4".to_string(),
            entity_type: "individual".to_string(),
            kind: "consume".to_string(),
            pathway: Some("DEVELOPER".to_string()),
            value: Some("10".to_string()),
            detail: None,
        };

        replay.apply(&consume).unwrap();
        assert_eq!(replay.unit_snapshot("user-4", Pathway::Developer).unwrap().consumed_units, 10);

        replay.apply(&consume).unwrap();
        assert_eq!(replay.unit_snapshot("user-4", Pathway::Developer).unwrap().consumed_units, 20);
    }
}
