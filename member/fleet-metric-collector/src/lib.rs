//! Member-side metric collection agent.
//!
//! Watches the `MetricReport` objects in this member's dedicated hub
//! namespace, refreshes their status from the member-local Prometheus on
//! a fixed interval, and leaves lifecycle management to the hub-side
//! approval controller.

pub mod config;
pub mod controller;
pub mod hub;
pub mod prometheus;
