//! Continuous device watch loop.
//!
//! Polls the transports on the configured interval, diffs the serial set
//! against the previous pass, and turns arrivals and departures into
//! notifications plus audit events. Runs until Ctrl-C.

use crate::analyzer::DeviceAnalyzer;
use crate::catalog::MethodCatalog;
use crate::device_manager::DeviceManager;
use crate::notifier::{Notification, NotificationQueue};
use crate::performance::PerformanceTracker;
use crate::recommender::recommended_methods;
use anyhow::Result;
use frp_common::{AuditEvent, AuditLogger, Config, DeviceInfo};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

pub struct DeviceMonitor<'a> {
    manager: &'a mut DeviceManager,
    catalog: &'a MethodCatalog,
    tracker: &'a PerformanceTracker,
    audit: Option<&'a AuditLogger>,
    queue: NotificationQueue,
    known: HashMap<String, DeviceInfo>,
}

impl<'a> DeviceMonitor<'a> {
    pub fn new(
        manager: &'a mut DeviceManager,
        catalog: &'a MethodCatalog,
        tracker: &'a PerformanceTracker,
        audit: Option<&'a AuditLogger>,
    ) -> Self {
        Self {
            manager,
            catalog,
            tracker,
            audit,
            queue: NotificationQueue::new(),
            known: HashMap::new(),
        }
    }

    /// Poll until Ctrl-C.
    pub async fn run(&mut self, config: &Config) -> Result<()> {
        let mut poll = tokio::time::interval(Duration::from_secs(config.device.poll_interval_secs));
        let mut render = tokio::time::interval(Duration::from_secs(1));

        info!(
            "Watching for devices every {}s (Ctrl-C to stop)",
            config.device.poll_interval_secs
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Stopping device watch");
                    break;
                }
                _ = poll.tick() => {
                    self.poll_once().await;
                }
                _ = render.tick() => {
                    for notification in self.queue.drain_visible() {
                        println!("{}", notification.render());
                    }
                }
            }
        }

        Ok(())
    }

    /// One scan pass: diff serials, emit events for arrivals and departures.
    pub async fn poll_once(&mut self) {
        let devices = self.manager.scan_devices().await;

        let mut current: HashMap<String, DeviceInfo> = HashMap::new();
        for device in devices {
            current.insert(device.serial.clone(), device);
        }

        for (serial, device) in &current {
            if !self.known.contains_key(serial) {
                self.on_connected(device).await;
            }
        }

        for (serial, device) in &self.known {
            if !current.contains_key(serial) {
                self.queue
                    .push(Notification::device_disconnected(&device.masked_serial()));
            }
        }

        self.known = current;
    }

    async fn on_connected(&mut self, device: &DeviceInfo) {
        self.queue.push(Notification::device_connected(device));
        if let Some(audit) = self.audit {
            if let Err(e) = audit.log(&AuditEvent::device_detection(device)).await {
                tracing::warn!("Failed to write audit event: {}", e);
            }
        }

        let analyzer = DeviceAnalyzer::new(self.catalog);
        let profile = analyzer.analyze(device, self.tracker);
        self.queue.push(Notification::analysis_complete(
            device,
            profile.recommended_methods.len(),
        ));

        if let Some(best) = recommended_methods(self.catalog, device, self.tracker).first() {
            self.queue.push(Notification::method_recommendation(
                device,
                &best.method.name,
                best.probability,
            ));
        }
    }
}
