//! Common test utilities for calwater.
//!
//! This module provides shared utilities for testing the calwater server.

#![allow(dead_code)]

pub mod assertions;
pub mod http_client;
pub mod test_data;
