//! Core data types for FRP Freedom

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a device is currently reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Booted system with the debug bridge responding
    Adb,
    /// Bootloader / flasher mode
    Fastboot,
    /// Vendor download mode (Odin, EDL)
    Download,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::Adb => "adb",
            ConnectionMode::Fastboot => "fastboot",
            ConnectionMode::Download => "download",
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FRP lock state as far as the probe can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrpStatus {
    Enabled,
    Disabled,
    FrpLocked,
    SetupComplete,
    #[default]
    Unknown,
}

impl FrpStatus {
    /// States where no FRP lock stands in the way.
    pub fn is_clear(&self) -> bool {
        matches!(self, FrpStatus::Disabled | FrpStatus::SetupComplete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrpStatus::Enabled => "enabled",
            FrpStatus::Disabled => "disabled",
            FrpStatus::FrpLocked => "frp_locked",
            FrpStatus::SetupComplete => "setup_complete",
            FrpStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FrpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared risk of a bypass method
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Numeric score used as a ranking tiebreaker (lower risk wins).
    pub fn score(&self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(s)
    }
}

/// Method category - decides which executor branch handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodCategory {
    Adb,
    Interface,
    System,
    Hardware,
}

impl fmt::Display for MethodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MethodCategory::Adb => "adb",
            MethodCategory::Interface => "interface",
            MethodCategory::System => "system",
            MethodCategory::Hardware => "hardware",
        };
        f.write_str(s)
    }
}

/// Immutable device snapshot produced by a probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub serial: String,
    pub model: String,
    pub manufacturer: String,
    pub android_version: String,
    pub sdk_version: String,
    pub bootloader_version: String,
    pub security_patch: String,
    pub chipset: String,
    pub frp_status: FrpStatus,
    pub connection: ConnectionMode,
}

impl DeviceInfo {
    /// Derived key for historical performance data: brand+model+OS version.
    pub fn signature(&self) -> String {
        format!(
            "{}|{}|{}",
            self.manufacturer.to_lowercase(),
            self.model.to_lowercase(),
            self.android_version
        )
    }

    /// Serial with the tail masked, for audit records.
    pub fn masked_serial(&self) -> String {
        match self.serial.get(..4) {
            Some(head) if self.serial.len() > 4 => format!("{}****", head),
            _ => "unknown".to_string(),
        }
    }

    pub fn brand(&self) -> String {
        self.manufacturer.to_lowercase()
    }

    /// Android release as a number ("15.0" -> 15.0, "15" -> 15.0).
    /// None for placeholder values like "unknown".
    pub fn android_release(&self) -> Option<f64> {
        let v = self.android_version.trim();
        v.parse::<f64>()
            .ok()
            .or_else(|| v.split('.').next()?.parse::<f64>().ok())
    }

    /// Year of the last security patch, when the field parses as YYYY-MM-DD.
    pub fn security_patch_year(&self) -> Option<i32> {
        self.security_patch.split('-').next()?.parse::<i32>().ok()
    }
}

/// Static descriptor of one bypass method from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub description: String,
    pub category: MethodCategory,
    pub risk: RiskLevel,
    /// Declared base success rate in [0, 1]
    pub success_rate: f64,
    pub estimated_minutes: u32,
    /// Free-text requirements, checked by the executor pre-flight
    pub requirements: Vec<String>,
    pub supported_devices: Vec<String>,
    pub android_versions: Vec<String>,
}

/// Result of a bypass attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassOutcome {
    Success,
    Failed,
    Partial,
    DeviceError,
    UserCancelled,
    VerificationFailed,
}

impl BypassOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BypassOutcome::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BypassOutcome::Success => "success",
            BypassOutcome::Failed => "failed",
            BypassOutcome::Partial => "partial",
            BypassOutcome::DeviceError => "device_error",
            BypassOutcome::UserCancelled => "user_cancelled",
            BypassOutcome::VerificationFailed => "verification_failed",
        }
    }
}

impl fmt::Display for BypassOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-field report for every bypass attempt, success or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BypassReport {
    pub attempt_id: String,
    pub method: String,
    pub outcome: BypassOutcome,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

impl BypassReport {
    pub fn new(method: &str, outcome: BypassOutcome, message: impl Into<String>) -> Self {
        Self {
            attempt_id: format!("attempt_{}", uuid::Uuid::new_v4()),
            method: method.to_string(),
            outcome,
            message: message.into(),
            details: BTreeMap::new(),
            started_at: Utc::now(),
            duration_secs: 0.0,
        }
    }

    /// Failure sentinel with empty details.
    pub fn failed(method: &str, message: impl Into<String>) -> Self {
        Self::new(method, BypassOutcome::Failed, message)
    }
}

/// FRP bypass complexity bucket derived from the complexity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            Complexity::Low
        } else if score < 0.7 {
            Complexity::Medium
        } else {
            Complexity::High
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        };
        f.write_str(s)
    }
}

/// Heuristic analysis result for one device.
///
/// Derived on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub vulnerability_score: f64,
    pub complexity_score: f64,
    pub frp_complexity: Complexity,
    pub recommended_methods: Vec<String>,
    /// Per-method success probability estimate, ordered for stable output
    pub success_probability: BTreeMap<String, f64>,
    pub security_assessment: String,
    pub bypass_strategy: String,
}

/// A catalog method paired with its computed success probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedMethod {
    pub method: MethodDescriptor,
    pub probability: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceInfo {
        DeviceInfo {
            serial: "R58M123ABC".to_string(),
            model: "SM-G991B".to_string(),
            manufacturer: "Samsung".to_string(),
            android_version: "15.0".to_string(),
            sdk_version: "35".to_string(),
            bootloader_version: "unknown".to_string(),
            security_patch: "2024-03-01".to_string(),
            chipset: "exynos2100".to_string(),
            frp_status: FrpStatus::FrpLocked,
            connection: ConnectionMode::Adb,
        }
    }

    #[test]
    fn signature_is_lowercased_triple() {
        assert_eq!(device().signature(), "samsung|sm-g991b|15.0");
    }

    #[test]
    fn masked_serial_keeps_four_chars() {
        assert_eq!(device().masked_serial(), "R58M****");

        let mut d = device();
        d.serial = "abc".to_string();
        assert_eq!(d.masked_serial(), "unknown");
    }

    #[test]
    fn android_release_parses_variants() {
        let mut d = device();
        assert_eq!(d.android_release(), Some(15.0));

        d.android_version = "11".to_string();
        assert_eq!(d.android_release(), Some(11.0));

        d.android_version = "unknown".to_string();
        assert_eq!(d.android_release(), None);
    }

    #[test]
    fn security_patch_year() {
        assert_eq!(device().security_patch_year(), Some(2024));

        let mut d = device();
        d.security_patch = "unknown".to_string();
        assert_eq!(d.security_patch_year(), None);
    }

    #[test]
    fn frp_status_clear_states() {
        assert!(FrpStatus::Disabled.is_clear());
        assert!(FrpStatus::SetupComplete.is_clear());
        assert!(!FrpStatus::FrpLocked.is_clear());
        assert!(!FrpStatus::Unknown.is_clear());
    }

    #[test]
    fn risk_ordering_matches_score() {
        assert!(RiskLevel::Low < RiskLevel::High);
        assert_eq!(RiskLevel::Low.score(), 1);
        assert_eq!(RiskLevel::High.score(), 3);
    }

    #[test]
    fn outcome_serializes_snake_case() {
        let json = serde_json::to_string(&BypassOutcome::VerificationFailed).unwrap();
        assert_eq!(json, "\"verification_failed\"");
    }

    #[test]
    fn complexity_buckets() {
        assert_eq!(Complexity::from_score(0.1), Complexity::Low);
        assert_eq!(Complexity::from_score(0.5), Complexity::Medium);
        assert_eq!(Complexity::from_score(0.9), Complexity::High);
    }
}
