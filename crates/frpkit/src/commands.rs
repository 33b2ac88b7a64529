//! CLI command implementations.

use crate::analyzer::{contextual_help, device_tips, method_tips, DeviceAnalyzer};
use crate::catalog::MethodCatalog;
use crate::device_manager::DeviceManager;
use crate::executor::{estimate_bypass_time, BypassExecutor};
use crate::monitor::DeviceMonitor;
use crate::notifier::Notification;
use crate::performance::{PerformanceTracker, RateLimiter};
use crate::recommender::recommended_methods;
use anyhow::{bail, Result};
use console::style;
use frp_common::{AuditEvent, AuditLogger, BypassOutcome, Config, DeviceInfo, RiskLevel};

/// Build the audit logger unless the trail is disabled in config.
async fn maybe_audit(config: &Config) -> Result<Option<AuditLogger>> {
    if !config.security.audit_trail {
        return Ok(None);
    }
    let key = if config.security.encrypt_logs {
        Some(config.encryption_key()?)
    } else {
        None
    };
    Ok(Some(AuditLogger::new(&Config::logs_dir(), key).await?))
}

/// Rebuild session state from the audit trail so history blending and the
/// daily attempt cap survive across invocations. Stats are derived, never
/// stored separately; the audit log stays the single durable record.
pub(crate) async fn replay_session(
    audit: &AuditLogger,
    max_attempts: u32,
) -> (PerformanceTracker, RateLimiter) {
    let mut tracker = PerformanceTracker::new();
    let mut limiter = RateLimiter::new(max_attempts);

    if let Ok(events) = audit.read_all().await {
        for event in events {
            if event.event_type != "bypass_attempt" {
                continue;
            }
            let signature = event.details.get("signature").and_then(|v| v.as_str());
            let method = event.details.get("bypass_method").and_then(|v| v.as_str());
            let (Some(signature), Some(method)) = (signature, method) else {
                continue;
            };
            let duration = event
                .details
                .get("duration_secs")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            tracker.record_outcome(signature, method, event.success, duration);

            if let Some(serial) = event.details.get("serial_partial").and_then(|v| v.as_str()) {
                limiter.seed(serial, event.timestamp);
            }
        }
    }

    (tracker, limiter)
}

async fn session_state(
    config: &Config,
    audit: &Option<AuditLogger>,
) -> (PerformanceTracker, RateLimiter) {
    match audit {
        Some(audit) => replay_session(audit, config.security.max_attempts_per_device).await,
        None => (
            PerformanceTracker::new(),
            RateLimiter::new(config.security.max_attempts_per_device),
        ),
    }
}

async fn log_event(audit: &Option<AuditLogger>, event: AuditEvent) {
    if let Some(audit) = audit {
        if let Err(e) = audit.log(&event).await {
            tracing::warn!("Failed to write audit event: {}", e);
        }
    }
}

async fn find_device(manager: &mut DeviceManager, serial: &str) -> Result<DeviceInfo> {
    manager.scan_devices().await;
    match manager.device_by_serial(serial) {
        Some(device) => Ok(device.clone()),
        None => bail!(
            "No device with serial {} found. Run `frpkit scan` to list connected devices.",
            serial
        ),
    }
}

fn risk_styled(risk: RiskLevel) -> String {
    match risk {
        RiskLevel::Low => style("low").green().to_string(),
        RiskLevel::Medium => style("medium").yellow().to_string(),
        RiskLevel::High => style("high").red().to_string(),
    }
}

/// `frpkit scan`
pub async fn scan(config: &Config) -> Result<()> {
    let audit = maybe_audit(config).await?;
    let mut manager = DeviceManager::new(config);
    let devices = manager.scan_devices().await;

    if devices.is_empty() {
        println!("No devices found. Check the USB connection and that ADB debugging is reachable.");
        return Ok(());
    }

    println!("{}", style(format!("{} device(s) connected", devices.len())).bold());
    println!();
    for device in &devices {
        println!(
            "  {}  {} {}",
            style(&device.serial).cyan(),
            device.manufacturer,
            device.model
        );
        println!(
            "      Android {} (SDK {}), patch {}, via {}",
            device.android_version, device.sdk_version, device.security_patch, device.connection
        );
        println!("      FRP status: {}", style(device.frp_status).bold());
        if let Some(hint) = contextual_help(device) {
            println!("      {}", style(hint).dim());
        }
        println!();

        log_event(&audit, AuditEvent::device_detection(device)).await;
    }

    Ok(())
}

/// `frpkit methods`
pub async fn methods(config: &Config) -> Result<()> {
    let catalog = MethodCatalog::load(&config.bypass);

    if catalog.is_empty() {
        println!("All catalog sections are disabled in the configuration.");
        return Ok(());
    }

    println!("{}", style(format!("{} method(s) available", catalog.len())).bold());
    println!();
    for method in catalog.methods() {
        println!(
            "  {}  [{}] risk: {}",
            style(&method.name).cyan(),
            method.category,
            risk_styled(method.risk)
        );
        println!("      {}", method.description);
        println!(
            "      ~{} min, base success {:.0}%, requires: {}",
            method.estimated_minutes,
            method.success_rate * 100.0,
            method.requirements.join(", ")
        );
        println!(
            "      devices: {} | Android {}",
            method.supported_devices.join(", "),
            method.android_versions.join(", ")
        );
        println!();
    }

    Ok(())
}

/// `frpkit analyze <serial>`
pub async fn analyze(config: &Config, serial: &str) -> Result<()> {
    let audit = maybe_audit(config).await?;
    let mut manager = DeviceManager::new(config);
    let device = find_device(&mut manager, serial).await?;

    let catalog = MethodCatalog::load(&config.bypass);
    let (tracker, _) = session_state(config, &audit).await;
    let profile = DeviceAnalyzer::new(&catalog).analyze(&device, &tracker);

    println!(
        "{}",
        style(format!("Analysis for {} {}", device.manufacturer, device.model)).bold()
    );
    println!();
    println!("  Vulnerability score: {:.2}", profile.vulnerability_score);
    println!("  Complexity score:    {:.2}", profile.complexity_score);
    println!("  FRP complexity:      {}", profile.frp_complexity);
    println!();
    println!("  {}", profile.security_assessment);
    println!("  Strategy: {}", profile.bypass_strategy);
    println!();

    if profile.recommended_methods.is_empty() {
        println!("  No applicable methods for this device.");
    } else {
        println!("  Candidate methods:");
        for name in &profile.recommended_methods {
            let probability = profile.success_probability.get(name).copied().unwrap_or(0.0);
            let estimate = catalog
                .get(name)
                .map(|m| estimate_bypass_time(m, &device))
                .unwrap_or(0);
            println!(
                "    {}  {:.0}% estimated, ~{} min",
                style(name).cyan(),
                probability * 100.0,
                estimate
            );
        }
    }

    let tips = device_tips(&device);
    if !tips.is_empty() {
        println!();
        for tip in tips {
            println!("  {}", style(format!("Tip: {}", tip)).dim());
        }
    }

    Ok(())
}

/// `frpkit recommend <serial>`
pub async fn recommend(config: &Config, serial: &str) -> Result<()> {
    let audit = maybe_audit(config).await?;
    let mut manager = DeviceManager::new(config);
    let device = find_device(&mut manager, serial).await?;

    let catalog = MethodCatalog::load(&config.bypass);
    let (tracker, _) = session_state(config, &audit).await;
    let ranked = recommended_methods(&catalog, &device, &tracker);

    if ranked.is_empty() {
        println!(
            "No compatible methods for {} {} (Android {}).",
            device.manufacturer, device.model, device.android_version
        );
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "Recommendations for {} {} (Android {})",
            device.manufacturer, device.model, device.android_version
        ))
        .bold()
    );
    println!();
    for (i, entry) in ranked.iter().enumerate() {
        println!(
            "  {}. {}  {:.0}% | risk: {} | ~{} min",
            i + 1,
            style(&entry.method.name).cyan(),
            entry.probability * 100.0,
            risk_styled(entry.method.risk),
            estimate_bypass_time(&entry.method, &device)
        );
    }
    for tip in method_tips(&ranked[0].method.name) {
        println!("  {}", style(format!("Tip: {}", tip)).dim());
    }

    println!();
    println!(
        "Run {} to attempt the top method.",
        style(format!("frpkit bypass {} {}", device.serial, ranked[0].method.name)).bold()
    );

    Ok(())
}

/// `frpkit bypass <serial> <method> [--dry-run]`
pub async fn bypass(config: &Config, serial: &str, method: &str, dry_run: bool) -> Result<()> {
    let audit = maybe_audit(config).await?;
    let mut manager = DeviceManager::new(config);
    let device = find_device(&mut manager, serial).await?;

    let catalog = MethodCatalog::load(&config.bypass);
    let executor = BypassExecutor::new(&config.bypass);
    let (mut tracker, mut limiter) = session_state(config, &audit).await;

    let report = executor
        .execute_bypass(
            &mut manager,
            &catalog,
            &mut limiter,
            &device,
            method,
            dry_run,
            |step, percent| {
                println!("  [{:>3}%] {}", percent, step);
            },
        )
        .await;

    println!();
    let outcome_label = match report.outcome {
        BypassOutcome::Success => style(report.outcome).green().bold().to_string(),
        BypassOutcome::Partial => style(report.outcome).yellow().bold().to_string(),
        _ => style(report.outcome).red().bold().to_string(),
    };
    println!("Outcome: {} ({})", outcome_label, report.attempt_id);
    if !report.message.is_empty() {
        println!("  {}", report.message);
    }

    if report.outcome == BypassOutcome::UserCancelled {
        log_event(
            &audit,
            AuditEvent::security(
                "rate_limit",
                serde_json::json!({
                    "serial_partial": device.masked_serial(),
                    "bypass_method": method,
                }),
            ),
        )
        .await;
        return Ok(());
    }

    if dry_run {
        log_event(
            &audit,
            AuditEvent::general(
                "bypass_dry_run",
                serde_json::json!({
                    "serial_partial": device.masked_serial(),
                    "bypass_method": method,
                }),
            ),
        )
        .await;
        return Ok(());
    }

    log_event(
        &audit,
        AuditEvent::bypass_attempt(
            &device,
            &report.method,
            report.outcome,
            report.duration_secs,
            (!report.outcome.is_success()).then_some(report.message.as_str()),
        ),
    )
    .await;

    if !report.outcome.is_success() {
        println!(
            "{}",
            Notification::failure_insight(&report.method, &report.message).render()
        );
    }

    tracker.record(&device, &report.method, &report.outcome, report.duration_secs);
    let insights = tracker.insights();
    println!();
    println!(
        "{}",
        style(format!(
            "Session stats: {} attempt(s) recorded",
            insights.total_attempts
        ))
        .dim()
    );
    if let Some(reliable) = insights.most_reliable_methods.first() {
        println!(
            "{}",
            style(format!(
                "Most reliable so far: {} ({:.0}% over {} attempts)",
                reliable.method,
                reliable.success_rate * 100.0,
                reliable.attempts
            ))
            .dim()
        );
    }

    Ok(())
}

/// `frpkit watch`
pub async fn watch(config: &Config) -> Result<()> {
    let audit = maybe_audit(config).await?;
    let mut manager = DeviceManager::new(config);
    let catalog = MethodCatalog::load(&config.bypass);
    let (tracker, _) = session_state(config, &audit).await;

    let mut monitor = DeviceMonitor::new(&mut manager, &catalog, &tracker, audit.as_ref());
    monitor.run(config).await
}

/// `frpkit audit [--decrypt]`
pub async fn audit(config: &Config, decrypt: bool) -> Result<()> {
    let key = if decrypt && config.security.encrypt_logs {
        Some(config.encryption_key()?)
    } else {
        None
    };

    let logger = AuditLogger::new(&Config::logs_dir(), key).await?;
    let lines = logger.read_plaintext_lines().await?;

    if lines.is_empty() {
        println!("Audit log is empty: {}", logger.path().display());
        return Ok(());
    }

    println!(
        "{}",
        style(format!("{} audit record(s) in {}", lines.len(), logger.path().display())).bold()
    );
    for line in lines {
        println!("{}", line);
    }

    if !decrypt && config.security.encrypt_logs {
        println!();
        println!(
            "{}",
            style("Records are encrypted. Re-run with --decrypt to read them.").dim()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use frp_common::{ConnectionMode, FrpStatus};
    use tempfile::TempDir;

    fn device() -> DeviceInfo {
        DeviceInfo {
            serial: "R58M123ABC".to_string(),
            model: "SM-G960F".to_string(),
            manufacturer: "samsung".to_string(),
            android_version: "9".to_string(),
            sdk_version: "28".to_string(),
            bootloader_version: "unknown".to_string(),
            security_patch: "2023-05-01".to_string(),
            chipset: "exynos".to_string(),
            frp_status: FrpStatus::Enabled,
            connection: ConnectionMode::Adb,
        }
    }

    #[tokio::test]
    async fn replay_restores_history_and_attempt_counts() {
        let dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(dir.path(), None).await.unwrap();
        let d = device();

        logger
            .log(&AuditEvent::bypass_attempt(
                &d,
                "adb_setup_wizard",
                BypassOutcome::Success,
                120.0,
                None,
            ))
            .await
            .unwrap();
        logger
            .log(&AuditEvent::bypass_attempt(
                &d,
                "adb_setup_wizard",
                BypassOutcome::Failed,
                60.0,
                Some("wizard closed"),
            ))
            .await
            .unwrap();
        // Non-attempt events are skipped.
        logger
            .log(&AuditEvent::device_detection(&d))
            .await
            .unwrap();

        let (tracker, limiter) = replay_session(&logger, 3).await;

        assert_eq!(
            tracker.success_rate("adb_setup_wizard", &d.signature()),
            Some(0.5)
        );
        assert_eq!(limiter.remaining(&d.masked_serial()), 1);
    }

    #[tokio::test]
    async fn replay_of_empty_log_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(dir.path(), None).await.unwrap();

        let (tracker, limiter) = replay_session(&logger, 3).await;
        assert_eq!(tracker.insights().total_attempts, 0);
        assert_eq!(limiter.remaining(&device().masked_serial()), 3);
    }
}
