// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Value types shared across the xcode-arch crates
//!
//! These types are UI-agnostic: the CLI parses them from arguments, and the
//! preference lookup and version checks operate on them directly.

pub mod architecture;
pub mod version;

pub use architecture::{Architecture, ParseArchitectureError};
pub use version::{ParseVersionError, Version};
