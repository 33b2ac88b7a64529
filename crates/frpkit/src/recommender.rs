//! Ranked method recommendations.

use crate::analyzer::DeviceAnalyzer;
use crate::catalog::MethodCatalog;
use crate::performance::PerformanceTracker;
use frp_common::{DeviceInfo, RankedMethod, RiskLevel};

/// Candidate methods ranked by success probability, then by risk when
/// probabilities tie.
pub fn recommended_methods(
    catalog: &MethodCatalog,
    device: &DeviceInfo,
    tracker: &PerformanceTracker,
) -> Vec<RankedMethod> {
    let analyzer = DeviceAnalyzer::new(catalog);

    let mut ranked: Vec<RankedMethod> = analyzer
        .recommended_method_names(device)
        .into_iter()
        .filter_map(|name| {
            let method = catalog.get(&name)?.clone();
            let probability = analyzer.success_probability(&name, device, tracker);
            Some(RankedMethod {
                method,
                probability,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| risk_rank(a.method.risk).cmp(&risk_rank(b.method.risk)))
    });
    ranked
}

/// Best remaining candidate after some methods were already tried.
pub fn suggest_next_method(
    catalog: &MethodCatalog,
    device: &DeviceInfo,
    tracker: &PerformanceTracker,
    attempted: &[String],
) -> Option<RankedMethod> {
    recommended_methods(catalog, device, tracker)
        .into_iter()
        .find(|ranked| !attempted.contains(&ranked.method.name))
}

fn risk_rank(risk: RiskLevel) -> u8 {
    risk.score()
}

#[cfg(test)]
mod tests {
    use super::*;
    use frp_common::config::BypassConfig;
    use frp_common::{BypassOutcome, ConnectionMode, FrpStatus};

    fn device() -> DeviceInfo {
        DeviceInfo {
            serial: "R58M123ABC".to_string(),
            model: "SM-G960F".to_string(),
            manufacturer: "samsung".to_string(),
            android_version: "8.0".to_string(),
            sdk_version: "26".to_string(),
            bootloader_version: "unknown".to_string(),
            security_patch: "2021-02-01".to_string(),
            chipset: "exynos9810".to_string(),
            frp_status: FrpStatus::Enabled,
            connection: ConnectionMode::Adb,
        }
    }

    fn catalog() -> MethodCatalog {
        MethodCatalog::load(&BypassConfig::default())
    }

    #[test]
    fn ranking_is_sorted_by_probability() {
        let catalog = catalog();
        let ranked = recommended_methods(&catalog, &device(), &PerformanceTracker::new());

        assert!(!ranked.is_empty());
        for pair in ranked.windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
    }

    #[test]
    fn history_reshuffles_the_ranking() {
        let catalog = catalog();
        let d = device();
        let mut tracker = PerformanceTracker::new();

        let before = recommended_methods(&catalog, &d, &tracker);
        let top = before[0].method.name.clone();

        // Repeated failures should push the leader down.
        for _ in 0..4 {
            tracker.record(&d, &top, &BypassOutcome::Failed, 60.0);
        }
        let after = recommended_methods(&catalog, &d, &tracker);
        assert_ne!(after[0].method.name, top);
    }

    #[test]
    fn next_suggestion_skips_attempted_methods() {
        let catalog = catalog();
        let d = device();
        let tracker = PerformanceTracker::new();

        let ranked = recommended_methods(&catalog, &d, &tracker);
        let first = ranked[0].method.name.clone();

        let next = suggest_next_method(&catalog, &d, &tracker, &[first.clone()]).unwrap();
        assert_ne!(next.method.name, first);

        let all: Vec<String> = ranked.iter().map(|r| r.method.name.clone()).collect();
        assert!(suggest_next_method(&catalog, &d, &tracker, &all).is_none());
    }
}
