// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! gitgovernance
//!
//! This crate has no public API of its own — it exists to host the
//! workspace-level integration test suite under `tests/`, which exercises
//! the published crates (`gitgov-core`, `gitgov-crypto`, `gitgov-store`,
//! `gitgov-sync`, ...) together end to end. See the individual crates under
//! `crates/` for the actual library surface.
