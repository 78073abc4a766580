//! Test helpers shared by unit tests, integration tests and benchmarks.

pub mod fixture_solution;
pub mod recording_progress;
pub mod scripted_finder;
