// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! xcode-arch test utilities
//!
//! - Each test writes a unique log file under `target/test-logs`
//! - On success tests print a single line; on failure they print the log path and size
//! - [`AliasBlobBuilder`] assembles alias record buffers for decoder and resolver tests

// Lets `#[logged_test]` expansions inside this crate name `::xa_test_utils`.
extern crate self as xa_test_utils;

pub mod fixtures;
pub mod guard;
pub mod logging;
pub mod macros;

pub use fixtures::AliasBlobBuilder;
pub use guard::TestLoggerGuard;
pub use logging::{TestLogError, TestLogger, create_unique_test_log};
pub use xa_test_utils_macros::logged_test;
