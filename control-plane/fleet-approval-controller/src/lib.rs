//! Hub-side approval decision engine for staged multi-cluster rollouts.
//!
//! Watches approval requests emitted by the staged-update orchestrator,
//! provisions per-cluster `MetricReport` objects, aggregates the health
//! samples collected on the member clusters, and flips the `Approved`
//! condition once every tracked workload in every cluster of the stage is
//! healthy.

pub mod config;
pub mod controller;
pub mod startup;
