// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Errors reported by the asset loader collaborator.

use thiserror::Error;

/// Why a single asset failed to load.
///
/// A load failure is always isolated to its descriptor: the admission loader
/// logs it and moves on.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    /// The loader does not know the requested asset.
    #[error("asset '{0}' not found")]
    NotFound(String),
    /// The asset's data could not be decoded.
    #[error("failed to decode asset '{name}': {details}")]
    Decode {
        /// The asset name.
        name: String,
        /// Decoder diagnostics.
        details: String,
    },
    /// Fetching the asset's data failed.
    #[error("I/O error while loading asset: {0}")]
    Io(#[from] std::io::Error),
    /// The loader refused to start the load (e.g. the host is shutting down).
    #[error("load of asset '{0}' was rejected")]
    Rejected(String),
    /// Any other failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
