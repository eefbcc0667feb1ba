//! Gherkin scenarios for tag groups, run by `tests/cucumber_tests.rs`

pub mod features;
