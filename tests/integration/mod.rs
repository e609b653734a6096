//! Library-level integration tests: whole folder syncs and profile runs
//! against temporary trees.

mod engine_scenarios;
mod publish_profiles;
