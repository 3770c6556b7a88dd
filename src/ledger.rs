// 🪙 Resource Ledger - Generative units with staged overspending protection
//
// "Allocation is a VALUE (fixed), consumption is STATE (only grows)"
//
// Each GenerativeUnit belongs to one (entity_id, entity_type, pathway).
// Consumption passes through four gates (38.2 / 50 / 61.8 / 78.6 %). The
// first three only warn; the last one refuses the consumption outright.
// A gate fires at most once per entry, tracked by the overspending_risk
// high-water mark. Tripping the block gate is irreversible: the balance is
// left untouched but the entry refuses every later consumption.

use crate::alerts::{AlertSeverity, VisualAlert};
use crate::error::{TrustError, TrustResult};
use crate::fibonacci::{fibonacci_u, golden_ratio_score, largest_fibonacci_at_most};
use crate::pathway::Pathway;
use crate::policy::{BLOCK_THRESHOLD, CAUTION_THRESHOLD, CRITICAL_THRESHOLD, INFO_THRESHOLD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info, warn};

// ============================================================================
// PROTECTION GATES
// ============================================================================

struct ProtectionGate {
    threshold: f64,
    severity: AlertSeverity,
    title: &'static str,
}

/// Ascending; the last gate is the hard block
const PROTECTION_GATES: [ProtectionGate; 4] = [
    ProtectionGate {
        threshold: INFO_THRESHOLD,
        severity: AlertSeverity::Info,
        title: "Resource usage notice",
    },
    ProtectionGate {
        threshold: CAUTION_THRESHOLD,
        severity: AlertSeverity::Caution,
        title: "Half of allocation used",
    },
    ProtectionGate {
        threshold: CRITICAL_THRESHOLD,
        severity: AlertSeverity::Critical,
        title: "Critical decision point",
    },
    ProtectionGate {
        threshold: BLOCK_THRESHOLD,
        severity: AlertSeverity::Blocked,
        title: "Consumption blocked",
    },
];

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Why a consumption was refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockReason {
    /// Consumption would reach or pass the hard-block share of the allocation
    AllocationExceeded { projected_ratio: f64, limit: f64 },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::AllocationExceeded {
                projected_ratio,
                limit,
            } => write!(
                f,
                "consumption would reach {:.1}% of allocation (limit {:.1}%)",
                projected_ratio * 100.0,
                limit * 100.0
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionResult {
    pub success: bool,
    pub blocked: bool,
    pub block_reason: Option<BlockReason>,

    /// Newly crossed gates, ascending
    pub alerts: Vec<VisualAlert>,

    /// Ledger state after the call (unchanged when blocked)
    pub consumed_units: u64,
    pub remaining_units: u64,

    /// Ratio the consumption would have produced
    pub projected_ratio: f64,
}

/// One committed consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub amount: u64,
    pub reason: String,
    pub consumed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub milestone: String,
    pub progress: f64,
    pub overall_progress: f64,
    pub golden_ratio_score: f64,
    pub completed_milestones: usize,
    pub next_milestone: String,

    /// fibonacci(completed_milestones + 1)
    pub reward_units: u64,
    pub alert: VisualAlert,
}

// ============================================================================
// GENERATIVE UNIT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeUnit {
    /// Stable identity (UUID)
    pub id: String,

    pub entity_id: String,
    pub entity_type: String,
    pub pathway: Pathway,

    /// Fixed at creation
    pub allocated_units: u64,

    /// Only ever grows
    pub consumed_units: u64,

    /// allocated_units - consumed_units
    pub remaining_units: u64,

    /// Largest Fibonacci number <= remaining_units
    pub fibonacci_level: u64,

    /// Sequence index of fibonacci_level
    pub progression_index: usize,

    /// Milestone completion ratio scaled by the golden ratio, in [0, 1.618]
    pub golden_ratio_score: f64,

    /// High-water mark of the committed consumption ratio
    pub overspending_risk: f64,

    /// Ratio of the attempt that tripped the block gate; set once, never cleared
    #[serde(default)]
    pub blocked_at_ratio: Option<f64>,

    /// Milestone -> completion in [0, 1]; key set fixed by pathway
    pub pathway_progress: BTreeMap<String, f64>,

    pub overall_progress: f64,
    pub next_milestone: String,

    pub consumption_log: Vec<ConsumptionRecord>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerativeUnit {
    pub fn new(entity_id: &str, entity_type: &str, pathway: Pathway, initial_units: u64) -> Self {
        let now = Utc::now();
        let (fibonacci_level, progression_index) = largest_fibonacci_at_most(initial_units as f64);

        GenerativeUnit {
            id: uuid::Uuid::new_v4().to_string(),
            entity_id: entity_id.to_string(),
            entity_type: entity_type.to_string(),
            pathway,
            allocated_units: initial_units,
            consumed_units: 0,
            remaining_units: initial_units,
            fibonacci_level,
            progression_index,
            golden_ratio_score: 0.0,
            overspending_risk: 0.0,
            blocked_at_ratio: None,
            pathway_progress: pathway.initial_progress(),
            overall_progress: 0.0,
            next_milestone: pathway.milestones()[0].to_string(),
            consumption_log: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Share of the allocation consumed after adding `amount`
    pub fn projected_ratio(&self, amount: u64) -> f64 {
        let projected = self.consumed_units.saturating_add(amount);
        if self.allocated_units == 0 {
            return if projected > 0 { 1.0 } else { 0.0 };
        }
        projected as f64 / self.allocated_units as f64
    }

    /// Consume units, all-or-nothing
    ///
    /// Every gate between the high-water mark and the projected ratio emits
    /// an alert. Reaching the block gate leaves the balance untouched and
    /// locks the entry.
    pub fn consume(&mut self, amount: u64, reason: &str) -> ConsumptionResult {
        let projected_ratio = self.projected_ratio(amount);

        if let Some(tripped_ratio) = self.blocked_at_ratio {
            warn!(unit_id = %self.id, amount, "Consumption refused, allocation locked");
            let alert = VisualAlert::new(
                AlertSeverity::Blocked,
                "Allocation locked",
                &format!(
                    "An earlier request would have consumed {:.1}% of this allocation; no further consumption is allowed ({})",
                    tripped_ratio * 100.0,
                    reason
                ),
            );
            return self.refused(
                BlockReason::AllocationExceeded {
                    projected_ratio: tripped_ratio,
                    limit: BLOCK_THRESHOLD,
                },
                vec![alert],
                projected_ratio,
            );
        }

        let alerts: Vec<VisualAlert> = PROTECTION_GATES
            .iter()
            .filter(|gate| projected_ratio >= gate.threshold && self.overspending_risk < gate.threshold)
            .map(|gate| {
                VisualAlert::new(
                    gate.severity,
                    gate.title,
                    &format!(
                        "{:.1}% of {} allocated units would be consumed ({})",
                        projected_ratio * 100.0,
                        self.allocated_units,
                        reason
                    ),
                )
                .with_threshold(gate.threshold)
            })
            .collect();

        if projected_ratio >= BLOCK_THRESHOLD {
            let block_reason = BlockReason::AllocationExceeded {
                projected_ratio,
                limit: BLOCK_THRESHOLD,
            };
            warn!(
                unit_id = %self.id,
                amount,
                %block_reason,
                "Consumption blocked"
            );
            self.blocked_at_ratio = Some(projected_ratio);
            return self.refused(block_reason, alerts, projected_ratio);
        }

        let now = Utc::now();
        self.consumed_units += amount;
        self.remaining_units = self.allocated_units - self.consumed_units;
        self.overspending_risk = self.overspending_risk.max(projected_ratio);

        let (level, index) = largest_fibonacci_at_most(self.remaining_units as f64);
        self.fibonacci_level = level;
        self.progression_index = index;

        self.consumption_log.push(ConsumptionRecord {
            amount,
            reason: reason.to_string(),
            consumed_at: now,
        });
        self.updated_at = now;

        debug!(
            unit_id = %self.id,
            amount,
            remaining = self.remaining_units,
            fibonacci_level = self.fibonacci_level,
            "Consumption committed"
        );

        ConsumptionResult {
            success: true,
            blocked: false,
            block_reason: None,
            alerts,
            consumed_units: self.consumed_units,
            remaining_units: self.remaining_units,
            projected_ratio,
        }
    }

    fn refused(
        &self,
        block_reason: BlockReason,
        alerts: Vec<VisualAlert>,
        projected_ratio: f64,
    ) -> ConsumptionResult {
        ConsumptionResult {
            success: false,
            blocked: true,
            block_reason: Some(block_reason),
            alerts,
            consumed_units: self.consumed_units,
            remaining_units: self.remaining_units,
            projected_ratio,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.blocked_at_ratio.is_some()
    }

    /// Set one milestone's progress and recompute the derived fields
    pub fn update_progress(&mut self, milestone: &str, progress: f64) -> TrustResult<ProgressUpdate> {
        self.pathway.validate_milestone(milestone)?;

        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        self.pathway_progress.insert(milestone.to_string(), progress);

        let completed = self.pathway.completed_count(&self.pathway_progress);
        let total = self.pathway.milestones().len();

        self.overall_progress = self.pathway.overall_progress(&self.pathway_progress);
        self.golden_ratio_score = golden_ratio_score(completed as f64, total as f64);
        self.next_milestone = self.pathway.next_milestone(&self.pathway_progress).to_string();
        self.updated_at = Utc::now();

        let reward_units = fibonacci_u(completed + 1);

        let alert = if progress >= 1.0 {
            VisualAlert::new(
                AlertSeverity::Success,
                "Milestone completed",
                &format!(
                    "{} complete ({}/{}). Reward: {} units",
                    milestone, completed, total, reward_units
                ),
            )
        } else {
            VisualAlert::new(
                AlertSeverity::Info,
                "Progress updated",
                &format!(
                    "{} at {:.0}%, overall {:.0}%",
                    milestone,
                    progress * 100.0,
                    self.overall_progress * 100.0
                ),
            )
        };

        Ok(ProgressUpdate {
            milestone: milestone.to_string(),
            progress,
            overall_progress: self.overall_progress,
            golden_ratio_score: self.golden_ratio_score,
            completed_milestones: completed,
            next_milestone: self.next_milestone.clone(),
            reward_units,
            alert,
        })
    }

    /// Highest gate already crossed, if any
    pub fn highest_gate_crossed(&self) -> Option<f64> {
        PROTECTION_GATES
            .iter()
            .map(|gate| gate.threshold)
            .filter(|threshold| self.overspending_risk >= *threshold)
            .last()
    }
}

// ============================================================================
// RESOURCE LEDGER
// ============================================================================

/// In-memory store of generative units, keyed by unit id
///
/// Passed explicitly to callers; one ledger per run or test. Persistence
/// belongs to the collaborator (see `db`), which hands records back via
/// `restore`.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    units: HashMap<String, GenerativeUnit>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        ResourceLedger {
            units: HashMap::new(),
        }
    }

    /// Create a unit with a fresh allocation
    pub fn create(
        &mut self,
        entity_id: &str,
        entity_type: &str,
        pathway: Pathway,
        initial_units: u64,
    ) -> GenerativeUnit {
        let unit = GenerativeUnit::new(entity_id, entity_type, pathway, initial_units);
        info!(
            unit_id = %unit.id,
            entity_id,
            pathway = %pathway,
            initial_units,
            "Generative unit created"
        );
        self.units.insert(unit.id.clone(), unit.clone());
        unit
    }

    pub fn consume(&mut self, unit_id: &str, amount: u64, reason: &str) -> TrustResult<ConsumptionResult> {
        let unit = self
            .units
            .get_mut(unit_id)
            .ok_or_else(|| TrustError::unit_not_found(unit_id))?;
        Ok(unit.consume(amount, reason))
    }

    pub fn update_pathway_progress(
        &mut self,
        unit_id: &str,
        milestone: &str,
        progress: f64,
    ) -> TrustResult<ProgressUpdate> {
        let unit = self
            .units
            .get_mut(unit_id)
            .ok_or_else(|| TrustError::unit_not_found(unit_id))?;
        unit.update_progress(milestone, progress)
    }

    pub fn get(&self, unit_id: &str) -> Option<&GenerativeUnit> {
        self.units.get(unit_id)
    }

    /// Unit owned by an entity on a given pathway; the earliest one if several exist
    pub fn find_by_entity(&self, entity_id: &str, pathway: Pathway) -> Option<&GenerativeUnit> {
        self.units
            .values()
            .filter(|u| u.entity_id == entity_id && u.pathway == pathway)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
    }

    /// All units, ordered by creation time
    pub fn all_units(&self) -> Vec<&GenerativeUnit> {
        let mut units: Vec<&GenerativeUnit> = self.units.values().collect();
        units.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        units
    }

    /// Re-insert a record handed back by the persistence collaborator
    pub fn restore(&mut self, unit: GenerativeUnit) {
        self.units.insert(unit.id.clone(), unit);
    }

    pub fn count(&self) -> usize {
        self.units.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with_unit(units: u64) -> (ResourceLedger, String) {
        let mut ledger = ResourceLedger::new();
        let unit = ledger.create("entity-1", "user", Pathway::Job, units);
        (ledger, unit.id)
    }

    #[test]
    fn test_create_unit() {
        let (ledger, id) = ledger_with_unit(100);
        let unit = ledger.get(&id).unwrap();

        assert_eq!(unit.allocated_units, 100);
        assert_eq!(unit.consumed_units, 0);
        assert_eq!(unit.remaining_units, 100);
        assert_eq!(unit.fibonacci_level, 89);
        assert_eq!(unit.progression_index, 11);
        assert_eq!(unit.overspending_risk, 0.0);
        assert_eq!(unit.next_milestone, "resume_ready");
        assert!(unit.pathway_progress.values().all(|p| *p == 0.0));
    }

    #[test]
    fn test_consume_commits_and_recomputes_level() {
        let (mut ledger, id) = ledger_with_unit(100);

        let result = ledger.consume(&id, 20, "profile generation").unwrap();
        assert!(result.success);
        assert!(!result.blocked);
        assert!(result.alerts.is_empty());

        let unit = ledger.get(&id).unwrap();
        assert_eq!(unit.consumed_units, 20);
        assert_eq!(unit.remaining_units, 80);
        assert_eq!(unit.fibonacci_level, 55);
        assert_eq!(unit.progression_index, 10);
        assert!((unit.overspending_risk - 0.2).abs() < 1e-12);
        assert_eq!(unit.consumption_log.len(), 1);
        assert_eq!(unit.consumption_log[0].reason, "profile generation");
    }

    #[test]
    fn test_consume_blocks_without_mutation() {
        let (mut ledger, id) = ledger_with_unit(100);

        let result = ledger.consume(&id, 79, "bulk export").unwrap();
        assert!(!result.success);
        assert!(result.blocked);
        assert!(matches!(
            result.block_reason,
            Some(BlockReason::AllocationExceeded { .. })
        ));
        assert!(result.alerts.last().unwrap().is_blocking());
        assert_eq!(result.alerts.len(), 4);

        let unit = ledger.get(&id).unwrap();
        assert_eq!(unit.consumed_units, 0);
        assert_eq!(unit.remaining_units, 100);
        assert_eq!(unit.overspending_risk, 0.0);
        assert!(unit.consumption_log.is_empty());
        assert!(unit.is_locked());

        let again = ledger.consume(&id, 50, "retry").unwrap();
        assert!(again.blocked);
        assert_eq!(again.block_reason, result.block_reason);
        assert_eq!(again.alerts.len(), 1);
        assert!(again.alerts[0].threshold.is_none());

        let unit = ledger.get(&id).unwrap();
        assert_eq!(unit.consumed_units, 0);
        assert_eq!(unit.remaining_units, 100);
    }

    #[test]
    fn test_block_after_partial_consumption() {
        let (mut ledger, id) = ledger_with_unit(100);

        assert!(ledger.consume(&id, 50, "first half").unwrap().success);

        let over = ledger.consume(&id, 30, "too much").unwrap();
        assert!(over.blocked);
        let thresholds: Vec<f64> = over.alerts.iter().filter_map(|a| a.threshold).collect();
        assert_eq!(thresholds, vec![CRITICAL_THRESHOLD, BLOCK_THRESHOLD]);

        let unit = ledger.get(&id).unwrap();
        assert_eq!(unit.consumed_units, 50);
        assert!((unit.overspending_risk - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_staged_alerts_fire_once() {
        let (mut ledger, id) = ledger_with_unit(100);

        let first = ledger.consume(&id, 40, "a").unwrap();
        assert_eq!(first.alerts.len(), 1);
        assert_eq!(first.alerts[0].threshold, Some(INFO_THRESHOLD));

        let second = ledger.consume(&id, 15, "b").unwrap();
        assert_eq!(second.alerts.len(), 1);
        assert_eq!(second.alerts[0].threshold, Some(CAUTION_THRESHOLD));
        assert_eq!(second.alerts[0].severity, AlertSeverity::Caution);

        let third = ledger.consume(&id, 15, "c").unwrap();
        assert_eq!(third.alerts.len(), 1);
        assert_eq!(third.alerts[0].threshold, Some(CRITICAL_THRESHOLD));

        let fourth = ledger.consume(&id, 1, "d").unwrap();
        assert!(fourth.success);
        assert!(fourth.alerts.is_empty());

        assert_eq!(ledger.get(&id).unwrap().highest_gate_crossed(), Some(CRITICAL_THRESHOLD));
    }

    #[test]
    fn test_alerts_ascending_when_crossing_several_gates() {
        let (mut ledger, id) = ledger_with_unit(100);

        let result = ledger.consume(&id, 70, "jump").unwrap();
        assert!(result.success);
        let thresholds: Vec<f64> = result.alerts.iter().filter_map(|a| a.threshold).collect();
        assert_eq!(thresholds, vec![INFO_THRESHOLD, CAUTION_THRESHOLD, CRITICAL_THRESHOLD]);
    }

    #[test]
    fn test_zero_allocation_blocks_any_consumption() {
        let (mut ledger, id) = ledger_with_unit(0);

        let noop = ledger.consume(&id, 0, "nothing").unwrap();
        assert!(noop.success);
        assert!(noop.alerts.is_empty());

        let result = ledger.consume(&id, 1, "anything").unwrap();
        assert!(result.blocked);
    }

    #[test]
    fn test_unknown_unit_is_error() {
        let mut ledger = ResourceLedger::new();
        let err = ledger.consume("missing", 1, "x").unwrap_err();
        assert!(matches!(err, TrustError::EntryNotFound { .. }));

        let err = ledger.update_pathway_progress("missing", "resume_ready", 1.0).unwrap_err();
        assert!(matches!(err, TrustError::EntryNotFound { .. }));
    }

    #[test]
    fn test_pathway_progress_and_rewards() {
        let (mut ledger, id) = ledger_with_unit(100);

        let partial = ledger.update_pathway_progress(&id, "resume_ready", 0.5).unwrap();
        assert_eq!(partial.completed_milestones, 0);
        assert_eq!(partial.reward_units, 1);
        assert_eq!(partial.alert.severity, AlertSeverity::Info);
        assert_eq!(partial.next_milestone, "resume_ready");

        let done = ledger.update_pathway_progress(&id, "resume_ready", 1.5).unwrap();
        assert_eq!(done.progress, 1.0);
        assert_eq!(done.completed_milestones, 1);
        assert_eq!(done.reward_units, 1);
        assert_eq!(done.alert.severity, AlertSeverity::Success);
        assert_eq!(done.next_milestone, "skills_verified");

        let second = ledger.update_pathway_progress(&id, "skills_verified", 1.0).unwrap();
        assert_eq!(second.completed_milestones, 2);
        assert_eq!(second.reward_units, 2);

        let unit = ledger.get(&id).unwrap();
        assert!((unit.overall_progress - 2.0 / 6.0).abs() < 1e-12);
        assert!((unit.golden_ratio_score - 1.618 * 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_milestone_rejected() {
        let (mut ledger, id) = ledger_with_unit(100);

        let err = ledger.update_pathway_progress(&id, "first_customer", 1.0).unwrap_err();
        assert!(matches!(err, TrustError::InvalidMilestone { .. }));
        assert!(!ledger.get(&id).unwrap().pathway_progress.contains_key("first_customer"));
    }

    #[test]
    fn test_find_and_restore() {
        let (mut ledger, id) = ledger_with_unit(100);
        let found = ledger.find_by_entity("entity-1", Pathway::Job).unwrap();
        assert_eq!(found.id, id);
        assert!(ledger.find_by_entity("entity-1", Pathway::Creative).is_none());

        let snapshot = ledger.get(&id).unwrap().clone();
        let mut fresh = ResourceLedger::new();
        fresh.restore(snapshot);
        assert_eq!(fresh.count(), 1);
        assert_eq!(fresh.all_units()[0].id, id);
    }

    #[test]
    fn test_find_by_entity_prefers_earliest_unit() {
        let mut ledger = ResourceLedger::new();
        let mut first = GenerativeUnit::new("entity-1", "individual", Pathway::Job, 100);
        let mut second = GenerativeUnit::new("entity-1", "individual", Pathway::Job, 200);
        second.created_at = first.created_at + chrono::Duration::seconds(5);
        first.id = "z-first".to_string();
        second.id = "a-second".to_string();
        ledger.restore(second);
        ledger.restore(first);

        for _ in 0..10 {
            let found = ledger.find_by_entity("entity-1", Pathway::Job).unwrap();
            assert_eq!(found.id, "z-first");
            assert_eq!(found.allocated_units, 100);
        }
    }
}
