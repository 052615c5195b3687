//! Blend shape presets and the commit-on-update proxy

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// VRM blend shape presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendShapePreset {
    Neutral,
    A,
    I,
    U,
    E,
    O,
    Blink,
    Joy,
    Angry,
    Sorrow,
    Fun,
    LookUp,
    LookDown,
    LookLeft,
    LookRight,
    BlinkL,
    BlinkR,
}

impl BlendShapePreset {
    pub const ALL: [BlendShapePreset; 17] = [
        Self::Neutral,
        Self::A,
        Self::I,
        Self::U,
        Self::E,
        Self::O,
        Self::Blink,
        Self::Joy,
        Self::Angry,
        Self::Sorrow,
        Self::Fun,
        Self::LookUp,
        Self::LookDown,
        Self::LookLeft,
        Self::LookRight,
        Self::BlinkL,
        Self::BlinkR,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::A => "a",
            Self::I => "i",
            Self::U => "u",
            Self::E => "e",
            Self::O => "o",
            Self::Blink => "blink",
            Self::Joy => "joy",
            Self::Angry => "angry",
            Self::Sorrow => "sorrow",
            Self::Fun => "fun",
            Self::LookUp => "look_up",
            Self::LookDown => "look_down",
            Self::LookLeft => "look_left",
            Self::LookRight => "look_right",
            Self::BlinkL => "blink_l",
            Self::BlinkR => "blink_r",
        }
    }
}

impl std::fmt::Display for BlendShapePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlendShapePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown blend shape preset: {}", s))
    }
}

/// Holds blend shape weights for one avatar.
///
/// `set_value` stages a weight; nothing is visible to the renderer until
/// `update` commits the staged values.
#[derive(Debug, Clone, Default)]
pub struct BlendShapeProxy {
    /// Presets the rig actually provides
    available: BTreeSet<BlendShapePreset>,
    staged: BTreeMap<BlendShapePreset, f32>,
    committed: BTreeMap<BlendShapePreset, f32>,
}

impl BlendShapeProxy {
    pub fn new(available: impl IntoIterator<Item = BlendShapePreset>) -> Self {
        Self {
            available: available.into_iter().collect(),
            staged: BTreeMap::new(),
            committed: BTreeMap::new(),
        }
    }

    /// Whether the rig provides this preset
    pub fn has(&self, preset: BlendShapePreset) -> bool {
        self.available.contains(&preset)
    }

    /// Stage a weight, clamped to [0, 1]. Returns false when the rig lacks the
    /// preset or the weight is not finite.
    pub fn set_value(&mut self, preset: BlendShapePreset, weight: f32) -> bool {
        if !self.has(preset) || !weight.is_finite() {
            return false;
        }
        self.staged.insert(preset, weight.clamp(0.0, 1.0));
        true
    }

    /// Staged weight (what the next commit will publish)
    pub fn value(&self, preset: BlendShapePreset) -> Option<f32> {
        self.staged.get(&preset).copied()
    }

    /// Commit staged weights so they take visible effect.
    pub fn update(&mut self) {
        for (&preset, &weight) in &self.staged {
            self.committed.insert(preset, weight);
        }
    }

    /// Committed weight, 0.0 if never set
    pub fn applied_value(&self, preset: BlendShapePreset) -> f32 {
        self.committed.get(&preset).copied().unwrap_or(0.0)
    }

    /// All committed weights
    pub fn applied(&self) -> &BTreeMap<BlendShapePreset, f32> {
        &self.committed
    }
}
