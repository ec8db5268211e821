// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::path::PathBuf;

use anyhow::anyhow;
use serde::Deserialize;

use crate::temperature::Temperature;

use super::normalize::TemperatureRange;

/// The temperature range as it is written in a configuration file.
#[derive(Clone, Copy, Debug, Deserialize)]
pub(super) struct RawRange {
    #[serde(default = "RawRange::default_min")]
    min_temperature: Temperature,

    #[serde(default = "RawRange::default_max")]
    max_temperature: Temperature,
}

impl RawRange {
    fn default_min() -> Temperature {
        Temperature::Celsius(TemperatureRange::DEFAULT.min() as f32)
    }

    fn default_max() -> Temperature {
        Temperature::Celsius(TemperatureRange::DEFAULT.max() as f32)
    }
}

impl TryFrom<RawRange> for TemperatureRange {
    type Error = anyhow::Error;

    fn try_from(raw: RawRange) -> anyhow::Result<Self> {
        // Whole degrees only, the fractional part is dropped the same way samples are.
        let min = raw.min_temperature.in_celsius().trunc() as i32;
        let max = raw.max_temperature.in_celsius().trunc() as i32;
        TemperatureRange::new(min, max).ok_or_else(|| {
            anyhow!(
                "min_temperature ({:#}) must be lower than max_temperature ({:#})",
                raw.min_temperature,
                raw.max_temperature
            )
        })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct RenderSettings {
    /// The temperatures mapped to black and white in the grayscale image.
    #[serde(flatten)]
    pub(crate) range: TemperatureRange,

    /// Where the most recent bitmap is saved.
    #[serde(default = "RenderSettings::default_path")]
    pub(crate) path: PathBuf,
}

impl RenderSettings {
    fn default_path() -> PathBuf {
        PathBuf::from("/var/lib/fire-watch/image.bmp")
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            range: TemperatureRange::DEFAULT,
            path: Self::default_path(),
        }
    }
}
