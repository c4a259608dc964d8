//! Link color selection.

use crate::models::RgbaColor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lowest value drawn for each RGB channel.
pub const CHANNEL_MIN: u8 = 50;

/// Highest value drawn for each RGB channel.
pub const CHANNEL_MAX: u8 = 255;

/// Alpha applied to every link color.
pub const LINK_ALPHA: f32 = 0.7;

/// Chooses the color shared by all links of one diagram.
pub trait ColorPicker {
    fn pick(&mut self, zone: &str) -> RgbaColor;
}

/// Random colors with each channel uniform in `[CHANNEL_MIN, CHANNEL_MAX]`.
pub struct RandomColors {
    rng: StdRng,
}

impl RandomColors {
    /// Reproducible colors for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Colors seeded from OS entropy; differ between runs.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seeded when a seed is given, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl ColorPicker for RandomColors {
    fn pick(&mut self, _zone: &str) -> RgbaColor {
        RgbaColor::new(
            self.rng.random_range(CHANNEL_MIN..=CHANNEL_MAX),
            self.rng.random_range(CHANNEL_MIN..=CHANNEL_MAX),
            self.rng.random_range(CHANNEL_MIN..=CHANNEL_MAX),
            LINK_ALPHA,
        )
    }
}

/// Always returns the same color.
#[derive(Debug, Clone, Copy)]
pub struct FixedColor(pub RgbaColor);

impl ColorPicker for FixedColor {
    fn pick(&mut self, _zone: &str) -> RgbaColor {
        self.0
    }
}
