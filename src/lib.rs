// Fibonacci Trust - Core Library
// Exposes all modules for use in the CLI and tests

pub mod error;
pub mod policy;
pub mod fibonacci;      // Sequence, retracement/extension levels, golden ratio score
pub mod alerts;         // Deaf-first visual alerts with haptic patterns
pub mod pathway;        // Fixed milestone sets per pathway
pub mod ledger;         // Generative units with staged overspending protection
pub mod badges;         // Badge and certification catalog
pub mod identity;       // Security identity scoring and risk
pub mod cache;
pub mod config;
pub mod db;
pub mod activity;       // CSV activity replay

// Re-export commonly used types
pub use error::{TrustError, TrustResult};
pub use fibonacci::{
    fibonacci, fibonacci_u, largest_fibonacci_at_most,
    retracement_levels, extension_levels, golden_ratio_score,
    FibonacciLevel,
};
pub use alerts::{AlertSeverity, HapticPattern, VisualAlert};
pub use pathway::Pathway;
pub use ledger::{
    BlockReason, ConsumptionRecord, ConsumptionResult, GenerativeUnit,
    ProgressUpdate, ResourceLedger,
};
pub use badges::{
    BadgeLevel, BadgeRegistry, BadgeTemplate, CatalogEntry,
    Certification, CertificationTemplate, SecurityBadge,
};
pub use identity::{
    ActivityOutcome, ActivityReport, InteractionType, RiskProfile,
    SecurityIdentity, SecurityIdentityEngine, SecurityLevel,
    overall_risk,
};
pub use cache::SnapshotCache;
pub use config::EngineConfig;
pub use db::{
    Event, setup_database, compute_content_hash,
    save_generative_unit, load_generative_unit, load_all_generative_units,
    save_identity, load_identity, load_all_identities,
    insert_event, get_events_for_entity, count_events,
};
pub use activity::{
    ActivityError, ActivityKind, ActivityReplay, ActivityRow,
    RejectedRow, ReplaySummary, RowOutcome,
    activity_from_reader, load_activity_csv,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
