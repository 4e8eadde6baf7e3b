//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the catalog and run whole
//! harvests end-to-end over HTTP sessions.

mod harvest_tests;
