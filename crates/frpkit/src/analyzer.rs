//! Device analysis and success estimation.
//!
//! Produces a per-device profile: heuristic vulnerability and complexity
//! scores, a ranked candidate method list, and a success probability per
//! candidate. Probabilities start from a per-method baseline, get adjusted
//! by version-keyed nudge tables, and are blended half-and-half with the
//! observed rate for this method on similar devices once history exists.

use crate::catalog::MethodCatalog;
use crate::compat::is_compatible;
use crate::performance::PerformanceTracker;
use frp_common::{Complexity, DeviceInfo, DeviceProfile};
use std::collections::BTreeMap;
use tracing::debug;

const PROBABILITY_FLOOR: f64 = 0.10;
const PROBABILITY_CEILING: f64 = 0.95;
const MAX_RECOMMENDATIONS: usize = 6;

/// Methods that stay reliable on a given Android major release.
const HIGH_SUCCESS_BY_MAJOR: &[(u32, &[&str])] = &[
    (5, &["adb_setup_wizard", "emergency_call_exploit"]),
    (6, &["adb_setup_wizard", "adb_talkback"]),
    (7, &["adb_setup_wizard", "adb_talkback"]),
    (8, &["adb_setup_wizard", "chrome_intent_exploit"]),
];

/// Methods known to be patched on a given major release.
const PATCHED_BY_MAJOR: &[(u32, &[&str])] = &[
    (10, &["emergency_call_exploit"]),
    (11, &["emergency_call_exploit", "adb_talkback"]),
    (12, &["emergency_call_exploit", "adb_talkback"]),
    (13, &["emergency_call_exploit", "adb_talkback", "chrome_intent_exploit"]),
    (14, &["emergency_call_exploit", "adb_talkback", "chrome_intent_exploit"]),
    (15, &["emergency_call_exploit", "adb_talkback", "chrome_intent_exploit"]),
];

const HIGH_SUCCESS_FACTOR: f64 = 1.15;
const PATCHED_FACTOR: f64 = 0.5;

pub struct DeviceAnalyzer<'a> {
    catalog: &'a MethodCatalog,
}

impl<'a> DeviceAnalyzer<'a> {
    pub fn new(catalog: &'a MethodCatalog) -> Self {
        Self { catalog }
    }

    pub fn analyze(&self, device: &DeviceInfo, tracker: &PerformanceTracker) -> DeviceProfile {
        let vulnerability_score = vulnerability_score(device);
        let complexity_score = complexity_score(device);
        let frp_complexity = Complexity::from_score(complexity_score);

        let recommended_methods = self.recommended_method_names(device);

        let mut success_probability = BTreeMap::new();
        for name in &recommended_methods {
            success_probability.insert(
                name.clone(),
                self.success_probability(name, device, tracker),
            );
        }

        debug!(
            "Analyzed {}: vuln={:.2} complexity={:.2} candidates={}",
            device.masked_serial(),
            vulnerability_score,
            complexity_score,
            recommended_methods.len()
        );

        DeviceProfile {
            vulnerability_score,
            complexity_score,
            frp_complexity,
            recommended_methods,
            success_probability,
            security_assessment: security_assessment(vulnerability_score),
            bypass_strategy: bypass_strategy(complexity_score, vulnerability_score),
        }
    }

    /// Candidate method names in priority order, deduplicated, truncated.
    pub fn recommended_method_names(&self, device: &DeviceInfo) -> Vec<String> {
        let mut names = Vec::new();

        // Version-specific picks first.
        if let Some(release) = device.android_release() {
            if release <= 8.0 {
                names.push("adb_setup_wizard");
                names.push("emergency_call_exploit");
            } else if release <= 10.0 {
                names.push("chrome_intent_exploit");
                names.push("accounts_db_modification");
            } else {
                names.push("accounts_db_modification");
                names.push("persist_partition_edit");
            }
        }

        // Brand-specific picks.
        match device.brand().as_str() {
            "samsung" => names.push("download_mode_flash"),
            "xiaomi" | "oneplus" => names.push("qualcomm_edl_exploit"),
            _ => {}
        }

        // Wide-open devices get the aggressive pair promoted.
        if vulnerability_score(device) > 0.7 {
            names.push("persist_partition_edit");
            names.push("qualcomm_edl_exploit");
        }

        // Everything else the device is compatible with, catalog order.
        let mut candidates: Vec<String> = names
            .into_iter()
            .filter_map(|name| self.catalog.get(name))
            .filter(|method| is_compatible(method, device))
            .map(|method| method.name.clone())
            .collect();

        for method in self.catalog.methods() {
            if is_compatible(method, device) {
                candidates.push(method.name.clone());
            }
        }

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|name| seen.insert(name.clone()));
        candidates.truncate(MAX_RECOMMENDATIONS);
        candidates
    }

    /// Success estimate for one method on one device, clamped away from
    /// certainty in both directions.
    pub fn success_probability(
        &self,
        method: &str,
        device: &DeviceInfo,
        tracker: &PerformanceTracker,
    ) -> f64 {
        let mut probability = base_probability(method);

        if let Some(major) = device.android_release().map(|r| r as u32) {
            if table_contains(HIGH_SUCCESS_BY_MAJOR, major, method) {
                probability *= HIGH_SUCCESS_FACTOR;
            }
            if table_contains(PATCHED_BY_MAJOR, major, method) {
                probability *= PATCHED_FACTOR;
            }
        }

        if let Some(historical) = tracker.success_rate(method, &device.signature()) {
            probability = 0.5 * probability + 0.5 * historical;
        }

        probability.clamp(PROBABILITY_FLOOR, PROBABILITY_CEILING)
    }
}

fn table_contains(table: &[(u32, &[&str])], major: u32, method: &str) -> bool {
    table
        .iter()
        .any(|(m, methods)| *m == major && methods.contains(&method))
}

fn base_probability(method: &str) -> f64 {
    match method {
        "adb_setup_wizard" => 0.80,
        "chrome_intent_exploit" => 0.75,
        "emergency_call_exploit" => 0.70,
        "adb_talkback" => 0.70,
        "accounts_db_modification" => 0.75,
        "persist_partition_edit" => 0.80,
        "download_mode_flash" => 0.70,
        "qualcomm_edl_exploit" => 0.65,
        _ => 0.60,
    }
}

/// How exposed the device looks, 0.0 (hardened) to 1.0 (wide open).
pub fn vulnerability_score(device: &DeviceInfo) -> f64 {
    let mut score: f64 = 0.5;

    if let Some(release) = device.android_release() {
        if release <= 6.0 {
            score += 0.3;
        } else if release <= 8.0 {
            score += 0.2;
        } else if release <= 10.0 {
            score += 0.1;
        } else if release >= 13.0 {
            score -= 0.2;
        }
    }

    match device.brand().as_str() {
        "samsung" | "lg" => score += 0.1,
        "google" | "pixel" => score -= 0.1,
        _ => {}
    }

    if let Some(year) = device.security_patch_year() {
        if year < 2022 {
            score += 0.2;
        } else if year < 2023 {
            score += 0.1;
        }
    }

    score.clamp(0.0, 1.0)
}

/// How much friction a bypass attempt should expect, 0.0 to 1.0.
pub fn complexity_score(device: &DeviceInfo) -> f64 {
    let mut score: f64 = 0.5;

    if let Some(release) = device.android_release() {
        if release >= 12.0 {
            score += 0.3;
        } else if release >= 10.0 {
            score += 0.2;
        } else if release <= 7.0 {
            score -= 0.2;
        }
    }

    match device.brand().as_str() {
        "huawei" | "honor" => score += 0.2,
        "xiaomi" => score += 0.1,
        _ => {}
    }

    score.clamp(0.0, 1.0)
}

fn security_assessment(vulnerability: f64) -> String {
    if vulnerability >= 0.7 {
        "Device has known weaknesses; multiple bypass paths are likely viable".to_string()
    } else if vulnerability >= 0.4 {
        "Device has moderate protections; select methods carefully".to_string()
    } else {
        "Device is well hardened; expect patched exploit surfaces".to_string()
    }
}

fn bypass_strategy(complexity: f64, vulnerability: f64) -> String {
    if complexity >= 0.7 {
        "Start with system-level methods; interface exploits are likely patched".to_string()
    } else if vulnerability >= 0.7 {
        "Start with the fastest low-risk method and escalate only if it fails".to_string()
    } else {
        "Work through candidates in ranked order, verifying after each attempt".to_string()
    }
}

/// Neutral profile for devices we could not probe.
pub fn default_profile() -> DeviceProfile {
    DeviceProfile {
        vulnerability_score: 0.5,
        complexity_score: 0.5,
        frp_complexity: Complexity::Medium,
        recommended_methods: Vec::new(),
        success_probability: BTreeMap::new(),
        security_assessment: "Insufficient device data for an assessment".to_string(),
        bypass_strategy: "Re-scan the device with ADB access before attempting a bypass"
            .to_string(),
    }
}

/// Short operator hint for a device state, used by the CLI.
pub fn contextual_help(device: &DeviceInfo) -> Option<String> {
    match device.frp_status {
        frp_common::FrpStatus::FrpLocked => Some(
            "Device is stuck at the setup wizard behind an FRP lock. Run `analyze` then `recommend` to pick a method.".to_string(),
        ),
        frp_common::FrpStatus::Enabled => Some(
            "FRP protection is active. A factory reset on this device will require the previous Google account.".to_string(),
        ),
        _ => None,
    }
}

/// Brand-specific operator tips.
pub fn device_tips(device: &DeviceInfo) -> Vec<String> {
    let mut tips = Vec::new();

    match device.brand().as_str() {
        "samsung" => {
            tips.push("Samsung devices expose download mode (Vol-Down + Power with USB attached); hardware methods go through it".to_string());
            tips.push("Samsung setup wizards before Android 10 respond well to the emergency call path".to_string());
        }
        "xiaomi" | "oneplus" => {
            tips.push("Qualcomm-based devices can usually reach EDL mode via test points or a deep-flash cable".to_string());
        }
        "huawei" | "honor" => {
            tips.push("Recent Huawei firmware blocks most interface exploits; expect system-level methods only".to_string());
        }
        "google" => {
            tips.push("Pixels patch interface exploits quickly; check the security patch date before picking a method".to_string());
        }
        _ => {}
    }

    if let Some(year) = device.security_patch_year() {
        if year < 2022 {
            tips.push("The security patch is several years old; most catalog methods predate it".to_string());
        }
    }

    tips
}

/// Tips keyed by the method's name family.
pub fn method_tips(method_name: &str) -> Vec<String> {
    let mut tips = Vec::new();

    if method_name.contains("adb") {
        tips.push("Requires the debug bridge to see the device; check `scan` output first".to_string());
    }
    if method_name.contains("emergency") {
        tips.push("Works from the lock screen dialer; needs physical access to the device".to_string());
    }
    if method_name.contains("chrome") {
        tips.push("The browser must be present and not disabled by the setup wizard".to_string());
    }
    if method_name.contains("download") || method_name.contains("edl") {
        tips.push("Hardware path: a failed flash can brick the device, keep stock firmware at hand".to_string());
    }
    if method_name.contains("partition") || method_name.contains("accounts") {
        tips.push("Needs privileged access; verify root or a custom recovery before starting".to_string());
    }

    tips
}
