//! In-memory attempt statistics and rate limiting.
//!
//! The tracker aggregates bypass outcomes per (method, device signature)
//! pair so the analyzer can blend real observations into its estimates.
//! Stats live for the process lifetime; the audit log is the durable record.

use chrono::{DateTime, Duration, Utc};
use frp_common::{BypassOutcome, DeviceInfo};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MethodStats {
    pub attempts: u32,
    pub successes: u32,
    pub total_duration_secs: f64,
    pub last_attempt: Option<DateTime<Utc>>,
}

impl MethodStats {
    pub fn success_rate(&self) -> Option<f64> {
        (self.attempts > 0).then(|| f64::from(self.successes) / f64::from(self.attempts))
    }

    pub fn average_duration_secs(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.total_duration_secs / f64::from(self.attempts))
    }
}

#[derive(Debug, Clone)]
pub struct InsightEntry {
    pub method: String,
    pub success_rate: f64,
    pub attempts: u32,
    pub average_duration_secs: f64,
}

/// Digest of what the tracker has learned so far.
#[derive(Debug, Clone, Default)]
pub struct LearningInsights {
    pub best_methods: Vec<InsightEntry>,
    pub trending_methods: Vec<InsightEntry>,
    pub fastest_methods: Vec<InsightEntry>,
    /// Proven methods: enough attempts and a majority of successes.
    pub most_reliable_methods: Vec<InsightEntry>,
    pub total_attempts: u32,
}

#[derive(Default)]
pub struct PerformanceTracker {
    stats: HashMap<(String, String), MethodStats>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        device: &DeviceInfo,
        method: &str,
        outcome: &BypassOutcome,
        duration_secs: f64,
    ) {
        self.record_outcome(&device.signature(), method, outcome.is_success(), duration_secs);
    }

    /// Record one attempt by raw signature, e.g. when replaying the audit
    /// log into a fresh tracker.
    pub fn record_outcome(
        &mut self,
        signature: &str,
        method: &str,
        success: bool,
        duration_secs: f64,
    ) {
        let key = (method.to_string(), signature.to_string());
        let stats = self.stats.entry(key).or_default();
        stats.attempts += 1;
        if success {
            stats.successes += 1;
        }
        stats.total_duration_secs += duration_secs;
        stats.last_attempt = Some(Utc::now());

        debug!(
            "Recorded {} on {}: success={} ({} attempts now)",
            method, signature, success, stats.attempts
        );
    }

    /// Observed success rate for a method on devices matching a signature.
    pub fn success_rate(&self, method: &str, signature: &str) -> Option<f64> {
        self.stats
            .get(&(method.to_string(), signature.to_string()))
            .and_then(|s| s.success_rate())
    }

    pub fn stats(&self, method: &str, signature: &str) -> Option<&MethodStats> {
        self.stats.get(&(method.to_string(), signature.to_string()))
    }

    /// Aggregate stats per method across all device signatures.
    fn per_method(&self) -> HashMap<String, MethodStats> {
        let mut merged: HashMap<String, MethodStats> = HashMap::new();
        for ((method, _), stats) in &self.stats {
            let entry = merged.entry(method.clone()).or_default();
            entry.attempts += stats.attempts;
            entry.successes += stats.successes;
            entry.total_duration_secs += stats.total_duration_secs;
            if stats.last_attempt > entry.last_attempt {
                entry.last_attempt = stats.last_attempt;
            }
        }
        merged
    }

    pub fn insights(&self) -> LearningInsights {
        let merged = self.per_method();
        let total_attempts = merged.values().map(|s| s.attempts).sum();

        let entry = |method: &str, stats: &MethodStats| InsightEntry {
            method: method.to_string(),
            success_rate: stats.success_rate().unwrap_or(0.0),
            attempts: stats.attempts,
            average_duration_secs: stats.average_duration_secs().unwrap_or(0.0),
        };

        let mut best: Vec<InsightEntry> = merged
            .iter()
            .filter(|(_, s)| s.attempts >= 2)
            .map(|(m, s)| entry(m, s))
            .collect();
        best.sort_by(|a, b| {
            b.success_rate
                .partial_cmp(&a.success_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.method.cmp(&b.method))
        });
        best.truncate(3);

        let recent_cutoff = Utc::now() - Duration::days(7);
        let mut trending: Vec<InsightEntry> = merged
            .iter()
            .filter(|(_, s)| s.last_attempt.is_some_and(|t| t >= recent_cutoff))
            .map(|(m, s)| entry(m, s))
            .collect();
        trending.sort_by(|a, b| b.attempts.cmp(&a.attempts).then(a.method.cmp(&b.method)));
        trending.truncate(5);

        let mut fastest: Vec<InsightEntry> = merged
            .iter()
            .filter(|(_, s)| s.successes > 0)
            .map(|(m, s)| entry(m, s))
            .collect();
        fastest.sort_by(|a, b| {
            a.average_duration_secs
                .partial_cmp(&b.average_duration_secs)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.method.cmp(&b.method))
        });
        fastest.truncate(3);

        let mut most_reliable: Vec<InsightEntry> = merged
            .iter()
            .filter(|(_, s)| s.attempts >= 3 && s.success_rate().unwrap_or(0.0) >= 0.5)
            .map(|(m, s)| entry(m, s))
            .collect();
        most_reliable.sort_by(|a, b| {
            b.success_rate
                .partial_cmp(&a.success_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.attempts.cmp(&a.attempts))
                .then(a.method.cmp(&b.method))
        });
        most_reliable.truncate(3);

        LearningInsights {
            best_methods: best,
            trending_methods: trending,
            fastest_methods: fastest,
            most_reliable_methods: most_reliable,
            total_attempts,
        }
    }
}

/// Per-serial daily attempt cap.
pub struct RateLimiter {
    max_attempts: u32,
    attempts: HashMap<String, Vec<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempts: HashMap::new(),
        }
    }

    /// Seed a historical attempt, e.g. when replaying the audit log.
    /// Skips the cap check.
    pub fn seed(&mut self, serial: &str, at: DateTime<Utc>) {
        self.attempts.entry(serial.to_string()).or_default().push(at);
    }

    /// Record an attempt for a serial. Returns false when the cap for the
    /// trailing 24 hours is already reached.
    pub fn try_attempt(&mut self, serial: &str) -> bool {
        let cutoff = Utc::now() - Duration::hours(24);
        let entries = self.attempts.entry(serial.to_string()).or_default();
        entries.retain(|t| *t >= cutoff);

        if entries.len() as u32 >= self.max_attempts {
            return false;
        }
        entries.push(Utc::now());
        true
    }

    pub fn remaining(&self, serial: &str) -> u32 {
        let cutoff = Utc::now() - Duration::hours(24);
        let used = self
            .attempts
            .get(serial)
            .map(|e| e.iter().filter(|t| **t >= cutoff).count() as u32)
            .unwrap_or(0);
        self.max_attempts.saturating_sub(used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use frp_common::{ConnectionMode, FrpStatus};

    fn device(model: &str) -> DeviceInfo {
        DeviceInfo {
            serial: "R58M123ABC".to_string(),
            model: model.to_string(),
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

    #[test]
    fn one_success_one_failure_is_half() {
        let mut tracker = PerformanceTracker::new();
        let d = device("SM-G960F");
        tracker.record(&d, "adb_setup_wizard", &BypassOutcome::Success, 120.0);
        tracker.record(&d, "adb_setup_wizard", &BypassOutcome::Failed, 60.0);

        let rate = tracker.success_rate("adb_setup_wizard", &d.signature()).unwrap();
        assert_relative_eq!(rate, 0.5);
    }

    #[test]
    fn signatures_partition_history() {
        let mut tracker = PerformanceTracker::new();
        tracker.record(&device("SM-G960F"), "adb_talkback", &BypassOutcome::Success, 10.0);

        assert!(tracker
            .success_rate("adb_talkback", &device("SM-G960F").signature())
            .is_some());
        assert!(tracker
            .success_rate("adb_talkback", &device("SM-A515F").signature())
            .is_none());
        assert!(tracker
            .success_rate("adb_setup_wizard", &device("SM-G960F").signature())
            .is_none());
    }

    #[test]
    fn partial_outcomes_count_as_failures() {
        let mut tracker = PerformanceTracker::new();
        let d = device("SM-G960F");
        tracker.record(&d, "adb_talkback", &BypassOutcome::Partial, 30.0);
        assert_relative_eq!(tracker.success_rate("adb_talkback", &d.signature()).unwrap(), 0.0);
    }

    #[test]
    fn insights_rank_best_and_fastest() {
        let mut tracker = PerformanceTracker::new();
        let d = device("SM-G960F");
        tracker.record(&d, "adb_setup_wizard", &BypassOutcome::Success, 100.0);
        tracker.record(&d, "adb_setup_wizard", &BypassOutcome::Success, 100.0);
        tracker.record(&d, "adb_talkback", &BypassOutcome::Success, 20.0);
        tracker.record(&d, "adb_talkback", &BypassOutcome::Failed, 20.0);

        let insights = tracker.insights();
        assert_eq!(insights.total_attempts, 4);
        assert_eq!(insights.best_methods[0].method, "adb_setup_wizard");
        assert_eq!(insights.fastest_methods[0].method, "adb_talkback");
        assert!(insights.trending_methods.len() <= 5);
    }

    #[test]
    fn most_reliable_needs_attempts_and_a_majority() {
        let mut tracker = PerformanceTracker::new();
        let d = device("SM-G960F");

        // Proven: 3 attempts, 2 successes.
        tracker.record(&d, "adb_setup_wizard", &BypassOutcome::Success, 100.0);
        tracker.record(&d, "adb_setup_wizard", &BypassOutcome::Success, 100.0);
        tracker.record(&d, "adb_setup_wizard", &BypassOutcome::Failed, 100.0);
        // Too few attempts.
        tracker.record(&d, "adb_talkback", &BypassOutcome::Success, 10.0);
        // Enough attempts, mostly failing.
        tracker.record(&d, "chrome_intent_exploit", &BypassOutcome::Failed, 10.0);
        tracker.record(&d, "chrome_intent_exploit", &BypassOutcome::Failed, 10.0);
        tracker.record(&d, "chrome_intent_exploit", &BypassOutcome::Success, 10.0);

        let reliable = tracker.insights().most_reliable_methods;
        assert_eq!(reliable.len(), 1);
        assert_eq!(reliable[0].method, "adb_setup_wizard");
    }

    #[test]
    fn replayed_outcomes_feed_the_same_counters() {
        let mut tracker = PerformanceTracker::new();
        let d = device("SM-G960F");
        tracker.record_outcome(&d.signature(), "adb_setup_wizard", true, 120.0);
        tracker.record_outcome(&d.signature(), "adb_setup_wizard", false, 60.0);

        assert_relative_eq!(
            tracker.success_rate("adb_setup_wizard", &d.signature()).unwrap(),
            0.5
        );
        let stats = tracker.stats("adb_setup_wizard", &d.signature()).unwrap();
        assert_relative_eq!(stats.average_duration_secs().unwrap(), 90.0);
    }

    #[test]
    fn seeded_attempts_count_against_the_cap() {
        let mut limiter = RateLimiter::new(2);
        limiter.seed("R58M****", Utc::now());
        limiter.seed("R58M****", Utc::now() - Duration::hours(48));

        // The stale entry falls outside the window, so one slot remains.
        assert_eq!(limiter.remaining("R58M****"), 1);
        assert!(limiter.try_attempt("R58M****"));
        assert!(!limiter.try_attempt("R58M****"));
    }

    #[test]
    fn rate_limiter_enforces_daily_cap() {
        let mut limiter = RateLimiter::new(3);
        assert!(limiter.try_attempt("SER1"));
        assert!(limiter.try_attempt("SER1"));
        assert!(limiter.try_attempt("SER1"));
        assert!(!limiter.try_attempt("SER1"));
        assert_eq!(limiter.remaining("SER1"), 0);

        // Other serials are tracked independently.
        assert!(limiter.try_attempt("SER2"));
        assert_eq!(limiter.remaining("SER2"), 2);
    }
}
