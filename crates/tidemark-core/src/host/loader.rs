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

//! The asset loading collaborator.

use crate::asset::{AssetDescriptor, AssetHandle, AssetLoadError};
use async_trait::async_trait;

/// Fetches and decodes one asset into a host handle.
///
/// Loading is the only operation in the subsystem that suspends on external
/// I/O. Implementations must be safe to call concurrently: the admission
/// loader runs up to `max_concurrent_loads` of them in parallel.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Loads the asset described by `descriptor`.
    async fn load(
        &self,
        descriptor: &AssetDescriptor,
    ) -> Result<Box<dyn AssetHandle>, AssetLoadError>;
}
