// SPDX-License-Identifier: GPL-3.0-or-later
use serde::Deserialize;

use crate::image_buffer::{GrayImage, ThermalImage};

/// The temperatures (in whole degrees Celsius) mapped to black and white.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(try_from = "super::settings::RawRange")]
pub(crate) struct TemperatureRange {
    min: i32,
    max: i32,
}

impl TemperatureRange {
    pub(crate) const DEFAULT: Self = Self { min: 20, max: 300 };

    /// Create a new range. `min` must be strictly lower than `max`.
    pub(crate) fn new(min: i32, max: i32) -> Option<Self> {
        if min < max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    pub(crate) fn min(&self) -> i32 {
        self.min
    }

    pub(crate) fn max(&self) -> i32 {
        self.max
    }

    /// Map a single temperature to a gray level.
    ///
    /// The temperature is truncated to a whole degree first, then scaled with integer division.
    /// Anything outside of the range is clamped to black or white.
    pub(crate) fn gray_level(&self, temperature: f32) -> u8 {
        // `as` truncates toward zero, saturates at the integer limits and turns NaN into 0.
        let whole_degrees = i64::from(temperature as i32);
        let offset = whole_degrees - i64::from(self.min);
        let span = i64::from(self.max) - i64::from(self.min);
        (offset * 255 / span).clamp(0, 255) as u8
    }
}

impl Default for TemperatureRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Convert a thermal image into a grayscale image using a fixed temperature range.
pub(crate) fn normalize(thermal: &ThermalImage, range: TemperatureRange) -> GrayImage {
    let mut gray = GrayImage::new(thermal.width(), thermal.height());
    for (temperature, level) in thermal.iter().zip(gray.iter_mut()) {
        *level = range.gray_level(*temperature);
    }
    gray
}
