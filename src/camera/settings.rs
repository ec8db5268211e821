// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::Context as _;
use linux_embedded_hal::I2cdev;
use serde::de::{Deserialize, Deserializer, Error};
use tracing::debug;

use super::i2c::Bus;
use super::mock_camera::{MockCamera, RepeatMode};
use super::thermal_camera::{Mlx90640, ThermalCamera};

/// The default I2C address for the MLX90640.
const DEFAULT_MLX90640_ADDRESS: u8 = 0x33;

fn default_mlx90640_address() -> u8 {
    DEFAULT_MLX90640_ADDRESS
}

/// The emissivity used when converting the infrared readings to temperatures.
///
/// The MLX90640 does not store an emissivity, so without this the driver assumes 1.0.
#[derive(Clone, Copy, Debug, serde::Deserialize, PartialEq)]
#[serde(try_from = "f32")]
pub(crate) struct Emissivity(f32);

impl Emissivity {
    const DEFAULT: Self = Self(0.95);
}

impl Default for Emissivity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f32> for Emissivity {
    type Error = String;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(format!("emissivity must be in (0, 1], not {}", value))
        }
    }
}

impl From<Emissivity> for f32 {
    fn from(emissivity: Emissivity) -> Self {
        emissivity.0
    }
}

struct TryFromNum<U>(PhantomData<U>);

impl<U> TryFromNum<U> {
    pub(super) fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<U>,
        <T as TryFrom<U>>::Error: fmt::Display,
        U: Deserialize<'de>,
    {
        let value: U = U::deserialize(deserializer)?;
        T::try_from(value).map_err(D::Error::custom)
    }
}

type TryFromF32 = TryFromNum<f32>;

/// Deserialize an optional frame rate, converting it from the rate in Hz.
fn optional_frame_rate<'de, D>(deserializer: D) -> Result<Option<mlx9064x::FrameRate>, D::Error>
where
    D: Deserializer<'de>,
{
    TryFromF32::deserialize(deserializer).map(Some)
}

#[derive(Clone, Debug, serde::Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub(crate) enum CameraSettings {
    Mlx90640 {
        #[serde(default)]
        bus: Bus,

        #[serde(default = "default_mlx90640_address")]
        address: u8,

        /// If not given, the camera is left at whatever rate it is currently using.
        #[serde(default, deserialize_with = "optional_frame_rate")]
        frame_rate: Option<mlx9064x::FrameRate>,

        #[serde(default)]
        emissivity: Emissivity,
    },
    #[serde(rename = "mock")]
    MockCamera {
        path: PathBuf,

        #[serde(default)]
        repeat_mode: RepeatMode,
    },
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self::Mlx90640 {
            bus: Bus::default(),
            address: DEFAULT_MLX90640_ADDRESS,
            frame_rate: None,
            emissivity: Emissivity::default(),
        }
    }
}

impl CameraSettings {
    /// Connect to the camera and load its calibration data.
    ///
    /// For the MLX90640 this dumps the EEPROM and extracts the calibration parameters, so any
    /// error returned from here should be treated as a calibration failure.
    pub(crate) fn create_camera(&self) -> anyhow::Result<Box<dyn ThermalCamera>> {
        Ok(match self {
            Self::Mlx90640 {
                bus,
                address,
                frame_rate,
                emissivity,
            } => {
                let i2c = I2cdev::try_from(bus)
                    .with_context(|| format!("Unable to connect to I2C bus {}", bus))?;
                let mut driver =
                    mlx9064x::Mlx90640Driver::new(i2c, *address).with_context(|| {
                        format!("Unable to load MLX90640 calibration from 0x{:02x}", address)
                    })?;
                driver.override_emissivity((*emissivity).into());
                let mut camera = Mlx90640::new(driver)?;
                if let Some(frame_rate) = frame_rate {
                    camera.set_frame_rate(*frame_rate)?;
                }
                debug!(
                    %bus,
                    address,
                    emissivity = f32::from(*emissivity),
                    "Connected to MLX90640"
                );
                Box::new(camera)
            }
            Self::MockCamera { path, repeat_mode } => {
                let camera = MockCamera::from_path(path, *repeat_mode)?;
                debug!(path = %path.display(), %repeat_mode, "Loaded recorded frames");
                Box::new(camera)
            }
        })
    }
}
