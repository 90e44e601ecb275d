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

//! Asset descriptors and load-phase classification.
//!
//! An [`AssetDescriptor`] is what a caller hands to the admission loader. The
//! loader never inspects the opaque load parameters; it only reads the name,
//! the classification tag, the derived [`LoadPhase`] and the priority score.

mod error;
mod handle;

pub use error::AssetLoadError;
pub use handle::{AssetHandle, LoadedAssetInfo};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag keywords that put an asset in the [`LoadPhase::Essential`] bucket.
///
/// Matched against whole tokens, optionally inflected (see
/// [`ESSENTIAL_SUFFIXES`]), so that `"lighting"` or `"scene_root"` qualify
/// while `"scenery"` or `"flight_path"` do not.
const ESSENTIAL_KEYWORDS: &[&str] = &["camera", "light", "scene", "skybox"];

const ESSENTIAL_SUFFIXES: &[&str] = &["", "s", "es", "ing"];

/// Tags of the assets the user directly interacts with.
const INTERACTIVE_TAGS: &[&str] = &[
    "interactive",
    "hero",
    "player",
    "character",
    "vehicle",
    "npc",
    "pickup",
    "door",
];

/// Tags of incidental decoration.
const DECORATIVE_TAGS: &[&str] = &[
    "decor",
    "decoration",
    "prop",
    "furniture",
    "plant",
    "ornament",
    "sign",
];

/// Tags of low-value filler that can always wait.
const BACKGROUND_TAGS: &[&str] = &[
    "background",
    "filler",
    "distant",
    "cloud",
    "ambient",
    "debris",
    "grass",
];

/// The four fixed load-order buckets, in admission order.
///
/// The derived `Ord` follows declaration order, so sorting by phase yields
/// Essential first and Background last.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum LoadPhase {
    /// Camera, lighting and scene roots. Nothing renders correctly without them.
    Essential,
    /// Central assets the user interacts with.
    Interactive,
    /// Incidental decoration.
    Decorative,
    /// Low-value filler.
    Background,
}

impl LoadPhase {
    /// All phases in admission order.
    pub const ALL: [LoadPhase; 4] = [
        LoadPhase::Essential,
        LoadPhase::Interactive,
        LoadPhase::Decorative,
        LoadPhase::Background,
    ];

    /// Classifies a tag into a phase.
    ///
    /// Every bucket is matched against the tag's alphanumeric tokens.
    /// Essential keywords win over everything else. Unrecognized tags land in
    /// [`LoadPhase::Decorative`].
    pub fn classify(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let tokens: Vec<&str> = tag
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.iter().any(|t| is_essential_token(t)) {
            return LoadPhase::Essential;
        }
        let has_any = |list: &[&str]| tokens.iter().any(|t| list.contains(t));

        if has_any(INTERACTIVE_TAGS) {
            LoadPhase::Interactive
        } else if has_any(BACKGROUND_TAGS) {
            LoadPhase::Background
        } else if has_any(DECORATIVE_TAGS) {
            LoadPhase::Decorative
        } else {
            log::trace!("Unrecognized asset tag '{tag}', defaulting to Decorative");
            LoadPhase::Decorative
        }
    }

    /// The priority score given to descriptors of this phase when the caller
    /// does not supply one.
    pub fn default_priority(self) -> i32 {
        match self {
            LoadPhase::Essential => 200,
            LoadPhase::Interactive => 100,
            LoadPhase::Decorative => -25,
            LoadPhase::Background => -50,
        }
    }
}

fn is_essential_token(token: &str) -> bool {
    ESSENTIAL_KEYWORDS.iter().any(|keyword| {
        token
            .strip_prefix(keyword)
            .is_some_and(|rest| ESSENTIAL_SUFFIXES.contains(&rest))
    })
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// An immutable request to load one asset.
///
/// Built with [`AssetDescriptor::new`] and the `with_*` builders before it is
/// enqueued; no accessor hands out mutable state afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    name: String,
    tag: String,
    phase: LoadPhase,
    priority: i32,
    #[serde(default)]
    params: serde_json::Value,
}

impl AssetDescriptor {
    /// Creates a descriptor whose phase is classified from `tag` and whose
    /// priority is that phase's default.
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let phase = LoadPhase::classify(&tag);
        Self {
            name: name.into(),
            tag,
            phase,
            priority: phase.default_priority(),
            params: serde_json::Value::Null,
        }
    }

    /// Overrides the priority score. Higher loads sooner within a phase.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Overrides the classified phase.
    pub fn with_phase(mut self, phase: LoadPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Attaches opaque parameters forwarded untouched to the asset loader.
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    /// The unique asset name. At most one loaded asset exists per name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The caller-supplied classification tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The load phase.
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// The priority score.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The opaque loader parameters.
    pub fn params(&self) -> &serde_json::Value {
        &self.params
    }
}
