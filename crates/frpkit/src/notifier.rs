//! Operator notifications for the watch loop.
//!
//! A small in-process queue; at most a few notifications render at once so
//! a busy scan cycle does not flood the terminal.

use chrono::{DateTime, Utc};
use frp_common::DeviceInfo;
use owo_colors::OwoColorize;
use std::collections::VecDeque;

const MAX_VISIBLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    DeviceConnected,
    DeviceDisconnected,
    MethodRecommendation,
    AnalysisComplete,
    FailureInsight,
    LearningUpdate,
}

impl NotificationKind {
    fn tag(self) -> &'static str {
        match self {
            Self::DeviceConnected => "device",
            Self::DeviceDisconnected => "device",
            Self::MethodRecommendation => "recommend",
            Self::AnalysisComplete => "analysis",
            Self::FailureInsight => "insight",
            Self::LearningUpdate => "learning",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }

    pub fn device_connected(device: &DeviceInfo) -> Self {
        Self::new(
            NotificationKind::DeviceConnected,
            "Device connected",
            format!(
                "{} {} (Android {}, {})",
                device.manufacturer, device.model, device.android_version, device.masked_serial()
            ),
        )
    }

    pub fn device_disconnected(serial_masked: &str) -> Self {
        Self::new(
            NotificationKind::DeviceDisconnected,
            "Device disconnected",
            serial_masked.to_string(),
        )
    }

    pub fn method_recommendation(device: &DeviceInfo, method: &str, probability: f64) -> Self {
        Self::new(
            NotificationKind::MethodRecommendation,
            "Recommended method",
            format!(
                "{} for {}: {} ({:.0}% estimated)",
                method,
                device.masked_serial(),
                device.model,
                probability * 100.0
            ),
        )
    }

    pub fn analysis_complete(device: &DeviceInfo, candidates: usize) -> Self {
        Self::new(
            NotificationKind::AnalysisComplete,
            "Analysis complete",
            format!(
                "{} candidate method(s) for {}",
                candidates,
                device.masked_serial()
            ),
        )
    }

    pub fn failure_insight(method: &str, message: &str) -> Self {
        Self::new(
            NotificationKind::FailureInsight,
            format!("{} failed", method),
            message.to_string(),
        )
    }

    pub fn learning_update(total_attempts: u32) -> Self {
        Self::new(
            NotificationKind::LearningUpdate,
            "Statistics updated",
            format!("{} attempt(s) recorded this session", total_attempts),
        )
    }

    pub fn render(&self) -> String {
        format!(
            "[{}] {} {}",
            self.kind.tag().dimmed(),
            self.title.bold(),
            self.body
        )
    }
}

#[derive(Default)]
pub struct NotificationQueue {
    pending: VecDeque<Notification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        self.pending.push_back(notification);
    }

    /// Pop up to the visible limit for one render pass.
    pub fn drain_visible(&mut self) -> Vec<Notification> {
        let take = self.pending.len().min(MAX_VISIBLE);
        self.pending.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
