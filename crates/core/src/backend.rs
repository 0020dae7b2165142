// Copyright 2025 VFS Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Identifiers of the supported runtime backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A runtime capable of executing the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendId {
    /// The Veracruz freestanding execution environment.
    #[serde(rename = "vc-fee")]
    VcFee,
    /// The wasmtime runtime.
    #[serde(rename = "wasmtime")]
    Wasmtime,
}

impl BackendId {
    /// Every supported backend.
    pub const ALL: [BackendId; 2] = [BackendId::VcFee, BackendId::Wasmtime];

    /// Canonical identifier, as used on the command line and in result files.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::VcFee => "vc-fee",
            BackendId::Wasmtime => "wasmtime",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        BackendId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| crate::Error::UnknownBackend(s.to_string()))
    }
}
