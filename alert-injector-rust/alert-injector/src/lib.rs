//! Alert pipeline tester.
//!
//! Pushes synthetic failure metrics (error rate, latency, resource
//! exhaustion) to a push gateway and checks that the alert manager reports
//! the alerts those metrics should trigger.

pub mod app;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod utils;
