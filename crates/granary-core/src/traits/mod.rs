// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams implemented by storage backends.

pub mod storage;

pub use storage::{HealthStatus, StorageAdapter};
