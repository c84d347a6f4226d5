//! Built-in one-shot haptic effects.

use crate::utils::error::{HapticPlayerError, Result};
use log::warn;
use std::fmt;
use std::str::FromStr;

/// One-shot effect a device can render outside the track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HapticEffect {
    #[default]
    Click,
    DoubleClick,
    Tick,
    Thud,
    Pop,
    HeavyClick,
}

impl HapticEffect {
    /// Every effect, in index order
    pub const ALL: [HapticEffect; 6] = [
        HapticEffect::Click,
        HapticEffect::DoubleClick,
        HapticEffect::Tick,
        HapticEffect::Thud,
        HapticEffect::Pop,
        HapticEffect::HeavyClick,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HapticEffect::Click => "click",
            HapticEffect::DoubleClick => "double_click",
            HapticEffect::Tick => "tick",
            HapticEffect::Thud => "thud",
            HapticEffect::Pop => "pop",
            HapticEffect::HeavyClick => "heavy_click",
        }
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| HapticPlayerError::HapticEffect(format!("no effect at index {}", index)))
    }

    /// Look up an effect by name, falling back to the default effect
    pub fn resolve(name: &str) -> Self {
        name.parse().unwrap_or_else(|e| {
            warn!("{}, falling back to {}", e, Self::default());
            Self::default()
        })
    }
}

impl FromStr for HapticEffect {
    type Err = HapticPlayerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|effect| effect.name() == wanted)
            .ok_or_else(|| HapticPlayerError::HapticEffect(format!("unknown effect '{}'", s)))
    }
}

impl fmt::Display for HapticEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
