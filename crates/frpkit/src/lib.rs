//! FRP Freedom toolkit - device detection, analysis, and simulated bypass
//! execution for Android FRP research.

pub mod adb;
pub mod analyzer;
pub mod catalog;
pub mod commands;
pub mod compat;
pub mod device_manager;
pub mod executor;
pub mod fastboot;
pub mod monitor;
pub mod notifier;
pub mod performance;
pub mod recommender;
