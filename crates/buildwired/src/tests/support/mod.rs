//! Test harness utilities for the server behavioural suites.

mod client;
mod config_loader;
mod reporter;
mod world;

pub use client::{TestClient, report};
pub use config_loader::{FailingConfigLoader, SAMPLE_PROJECT, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{TestWorld, world};
