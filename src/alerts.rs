// 🚨 Visual Alerts - Returned to the caller on threshold crossings
//
// Alerts are value objects. The core never stores them; the alerting
// collaborator decides how to show them (visual + haptic).

use serde::{Deserialize, Serialize};

// ============================================================================
// SEVERITY
// ============================================================================

/// Alert severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertSeverity {
    /// Something worth knowing, no action needed
    Info,

    /// Positive outcome (milestone completed, level gained)
    Success,

    /// Approaching a limit
    Caution,

    /// Decision point: continue only deliberately
    Critical,

    /// Operation refused
    Blocked,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Success => "success",
            AlertSeverity::Caution => "caution",
            AlertSeverity::Critical => "critical",
            AlertSeverity::Blocked => "blocked",
        }
    }

    /// Default haptic pattern for this severity
    pub fn default_haptic(&self) -> Option<HapticPattern> {
        match self {
            AlertSeverity::Info => None,
            AlertSeverity::Success => Some(HapticPattern::Gentle),
            AlertSeverity::Caution => Some(HapticPattern::Double),
            AlertSeverity::Critical => Some(HapticPattern::Pulse),
            AlertSeverity::Blocked => Some(HapticPattern::Urgent),
        }
    }
}

// ============================================================================
// HAPTIC PATTERN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HapticPattern {
    Gentle,
    Double,
    Pulse,
    Urgent,
}

impl HapticPattern {
    /// Alternating vibrate/pause durations in milliseconds
    pub fn durations_ms(&self) -> &'static [u32] {
        match self {
            HapticPattern::Gentle => &[100],
            HapticPattern::Double => &[150, 100, 150],
            HapticPattern::Pulse => &[200, 100, 200, 100, 200],
            HapticPattern::Urgent => &[400, 100, 400, 100, 400],
        }
    }
}

// ============================================================================
// VISUAL ALERT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualAlert {
    pub severity: AlertSeverity,

    /// Short headline
    pub title: String,

    /// Human-readable explanation
    pub message: String,

    /// Haptic pattern for deaf-first presentation
    pub haptic: Option<HapticPattern>,

    /// Threshold (as a ratio) that produced this alert, if any
    pub threshold: Option<f64>,
}

impl VisualAlert {
    /// Alert with the severity's default haptic pattern
    pub fn new(severity: AlertSeverity, title: &str, message: &str) -> Self {
        VisualAlert {
            severity,
            title: title.to_string(),
            message: message.to_string(),
            haptic: severity.default_haptic(),
            threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_haptic(mut self, haptic: Option<HapticPattern>) -> Self {
        self.haptic = haptic;
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == AlertSeverity::Blocked
    }

    pub fn summary(&self) -> String {
        format!("[{}] {}: {}", self.severity.as_str(), self.title, self.message)
    }
}
