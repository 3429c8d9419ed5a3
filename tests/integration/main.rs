//! Integration tests for Hint-Ripple
//!
//! These tests use wiremock to stand in for the remote endpoints and run the
//! real HTTP clients, frontier and writers end-to-end.

mod crawl_tests;
mod search_tests;
