//! End-to-end tests for the serial connector.
//!
//! These tests run the full connector, notification thread included, against
//! `MockPlatform` devices. No hardware is required.

pub mod discovery_tests;
pub mod workflow_tests;
