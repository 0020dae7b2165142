// Copyright 2025 VFS Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for the VFS benchmark harness.
//!
//! This crate holds what every other crate agrees on:
//!
//! - [`backend`] - the closed set of runtime identifiers
//! - [`config`] - layered harness configuration
//! - [`workload`] - the benchmarked program and its argument contract
//! - [`error`] - the shared error type

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod backend;
pub mod config;
pub mod error;
pub mod workload;

pub use backend::BackendId;
pub use config::HarnessConfig;
pub use error::{Error, InvokeFailure, Result};
pub use workload::Workload;
