//! Simulated bypass execution.
//!
//! Every attempt runs the same pipeline: pre-flight checks, the per-category
//! step sequence, then verification against the live device. Steps are
//! simulated; nothing here modifies device state. The report captures the
//! outcome for the audit trail and the performance tracker.

use crate::catalog::MethodCatalog;
use crate::compat::is_compatible;
use crate::device_manager::DeviceManager;
use crate::performance::RateLimiter;
use frp_common::config::BypassConfig;
use frp_common::{
    BypassOutcome, BypassReport, ConnectionMode, DeviceInfo, MethodCategory, MethodDescriptor,
};
use std::time::Duration;
use tracing::{info, warn};

const STEP_DELAY: Duration = Duration::from_millis(200);

pub struct BypassExecutor {
    simulate: bool,
}

impl BypassExecutor {
    pub fn new(config: &BypassConfig) -> Self {
        Self {
            simulate: config.simulate,
        }
    }

    /// Run one bypass attempt. `progress` receives a step label and a
    /// percentage in 0..=100.
    pub async fn execute_bypass<F>(
        &self,
        manager: &mut DeviceManager,
        catalog: &MethodCatalog,
        limiter: &mut RateLimiter,
        device: &DeviceInfo,
        method_name: &str,
        dry_run: bool,
        mut progress: F,
    ) -> BypassReport
    where
        F: FnMut(&str, u8),
    {
        let Some(method) = catalog.get(method_name) else {
            return BypassReport::failed(method_name, format!("Unknown method: {}", method_name));
        };
        let method = method.clone();

        if !is_compatible(&method, device) {
            return BypassReport::failed(
                &method.name,
                format!(
                    "{} is not compatible with {} {} (Android {})",
                    method.name, device.manufacturer, device.model, device.android_version
                ),
            );
        }

        let steps = category_steps(method.category);

        if dry_run {
            let mut report = BypassReport::new(
                &method.name,
                BypassOutcome::Success,
                format!("Dry run: {} steps planned, none executed", steps.len()),
            );
            report.details.insert("dry_run".to_string(), "true".to_string());
            for (i, step) in steps.iter().enumerate() {
                report
                    .details
                    .insert(format!("step_{}", i + 1), (*step).to_string());
                progress(step, plan_percent(i, steps.len()));
            }
            return report;
        }

        // Keyed by the masked serial so replayed audit records line up.
        if !limiter.try_attempt(&device.masked_serial()) {
            warn!("Attempt limit reached for {}", device.masked_serial());
            return BypassReport::new(
                &method.name,
                BypassOutcome::UserCancelled,
                "Daily attempt limit reached for this device",
            );
        }

        let started = std::time::Instant::now();
        info!(
            "Starting {} on {} ({})",
            method.name,
            device.masked_serial(),
            device.model
        );

        progress("Running pre-flight checks", 10);
        if let Err(message) = self.preflight(manager, &method, device).await {
            return finish(
                BypassReport::new(&method.name, BypassOutcome::DeviceError, message),
                started,
            );
        }
        progress("Pre-flight checks passed", 20);

        if !self.simulate {
            return finish(
                BypassReport::failed(
                    &method.name,
                    "Live execution is disabled in this build; set bypass.simulate",
                ),
                started,
            );
        }

        let mut report = BypassReport::new(&method.name, BypassOutcome::Success, "");
        for (i, step) in steps.iter().enumerate() {
            progress(step, plan_percent(i, steps.len()));
            tokio::time::sleep(STEP_DELAY).await;
            report
                .details
                .insert(format!("step_{}", i + 1), (*step).to_string());
        }

        progress("Verifying FRP status", 90);
        let (outcome, message) = self.verify(manager, device).await;
        report.outcome = outcome;
        report.message = message;
        progress("Done", 100);

        finish(report, started)
    }

    async fn preflight(
        &self,
        manager: &DeviceManager,
        method: &MethodDescriptor,
        device: &DeviceInfo,
    ) -> Result<(), String> {
        let needs_root = method
            .requirements
            .iter()
            .any(|r| r.eq_ignore_ascii_case("root access"));

        if needs_root && device.connection == ConnectionMode::Adb {
            let id = manager
                .adb_shell(&device.serial, &["su", "-c", "id"])
                .await
                .unwrap_or_default();
            if !id.contains("uid=0") {
                return Err(format!("{} requires root access", method.name));
            }
        }

        match method.category {
            MethodCategory::Adb | MethodCategory::Interface | MethodCategory::System => {
                if device.connection == ConnectionMode::Adb {
                    manager
                        .adb_shell(&device.serial, &["echo", "ok"])
                        .await
                        .map_err(|e| format!("Device unreachable: {}", e))?;
                }
            }
            MethodCategory::Hardware => {}
        }

        Ok(())
    }

    /// Re-probe the device and map its FRP state to an attempt outcome.
    async fn verify(
        &self,
        manager: &mut DeviceManager,
        device: &DeviceInfo,
    ) -> (BypassOutcome, String) {
        let Some(refreshed) = manager.refresh_device(&device.serial).await else {
            return (
                BypassOutcome::Partial,
                "Steps completed but the device disappeared before verification".to_string(),
            );
        };

        if refreshed.frp_status.is_clear() {
            return (
                BypassOutcome::Success,
                "FRP lock is no longer reported by the device".to_string(),
            );
        }

        match refreshed.frp_status {
            frp_common::FrpStatus::Unknown => (
                BypassOutcome::Partial,
                "Steps completed but FRP state could not be verified".to_string(),
            ),
            _ => (
                BypassOutcome::VerificationFailed,
                "Device still reports an active FRP lock".to_string(),
            ),
        }
    }
}

/// Rough wall-clock estimate for an attempt, in minutes.
pub fn estimate_bypass_time(method: &MethodDescriptor, device: &DeviceInfo) -> u32 {
    let mut minutes = f64::from(method.estimated_minutes);

    if let Some(release) = device.android_release() {
        let major = release as u32;
        if major == 5 {
            minutes *= 0.8;
        } else if (10..=12).contains(&major) {
            minutes *= 1.3;
        }
    }

    match device.brand().as_str() {
        "samsung" => minutes *= 1.1,
        "google" => minutes *= 1.2,
        _ => {}
    }

    minutes.ceil() as u32
}

fn category_steps(category: MethodCategory) -> &'static [&'static str] {
    match category {
        MethodCategory::Adb => &[
            "Checking debug bridge connectivity",
            "Enabling setup wizard debugging",
            "Injecting settings overrides",
            "Skipping account verification screen",
        ],
        MethodCategory::Interface => &[
            "Opening exploit entry point",
            "Navigating to device settings",
            "Clearing setup wizard data",
            "Restarting the setup flow",
        ],
        MethodCategory::System => &[
            "Confirming privileged access",
            "Backing up target records",
            "Rewriting FRP records",
            "Rebooting the device",
        ],
        MethodCategory::Hardware => &[
            "Waiting for service mode",
            "Validating device state",
            "Flashing patched image",
            "Rebooting to system",
        ],
    }
}

/// Map step index to a percentage between the pre-flight and verify marks.
fn plan_percent(index: usize, total: usize) -> u8 {
    let span = 60.0 / total.max(1) as f64;
    (25.0 + span * (index as f64 + 1.0)).round() as u8
}

fn finish(mut report: BypassReport, started: std::time::Instant) -> BypassReport {
    report.duration_secs = started.elapsed().as_secs_f64();
    report
}
