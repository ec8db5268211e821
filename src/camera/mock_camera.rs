// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::fmt;
use std::path::Path;

use anyhow::{anyhow, ensure, Context as _};
use serde::Deserialize;
use tracing::trace;

use crate::image_buffer::ThermalImage;
use crate::temperature::Temperature;

use super::thermal_camera::ThermalCamera;

/// A single frame recorded from a camera.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(try_from = "RawFrame")]
pub(crate) struct RecordedFrame {
    image: ThermalImage,
    ambient: Temperature,
}

#[derive(Deserialize)]
struct RawFrame {
    width: u32,
    height: u32,
    values: Vec<f32>,
    ambient: Temperature,
}

impl TryFrom<RawFrame> for RecordedFrame {
    type Error = anyhow::Error;

    fn try_from(raw: RawFrame) -> anyhow::Result<Self> {
        let RawFrame {
            width,
            height,
            values,
            ambient,
        } = raw;
        let value_count = values.len();
        let image = ThermalImage::from_vec(width, height, values).ok_or_else(|| {
            anyhow!(
                "{} values given for a {}x{} frame",
                value_count,
                width,
                height
            )
        })?;
        ensure!(
            image.len() == value_count,
            "{} values given for a {}x{} frame",
            value_count,
            width,
            height
        );
        Ok(Self { image, ambient })
    }
}

impl RecordedFrame {
    #[cfg(test)]
    pub(crate) fn new(image: ThermalImage, ambient: Temperature) -> Self {
        Self { image, ambient }
    }
}

#[derive(Deserialize)]
struct Recording {
    frames: Vec<RecordedFrame>,
}

/// Controls how frames are repeated by [`MockCamera`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RepeatMode {
    /// Don't repeat.
    ///
    /// Once the end of the recording has been reached, an error is returned.
    None,

    /// Loop over the frames. This is the default mode.
    Loop,

    /// Alternate between forward and reverse playback.
    ///
    /// The frames at either end of the recording are *not* repeated.
    Bounce,
}

impl Default for RepeatMode {
    fn default() -> Self {
        Self::Loop
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepeatMode::None => "none",
            RepeatMode::Loop => "loop",
            RepeatMode::Bounce => "bounce",
        };
        write!(f, "{}", s)
    }
}

/// A camera that plays back recorded frames, for running without the hardware.
pub(crate) struct MockCamera {
    frames: Vec<RecordedFrame>,
    index: Box<dyn Iterator<Item = usize>>,
}

impl MockCamera {
    pub(crate) fn new(frames: Vec<RecordedFrame>, repeat: RepeatMode) -> Self {
        let num_frames = frames.len();
        let index: Box<dyn Iterator<Item = usize>> = match repeat {
            RepeatMode::None => Box::new(0..num_frames),
            RepeatMode::Loop => Box::new((0..num_frames).cycle()),
            RepeatMode::Bounce => {
                let forwards = 0..num_frames;
                let backwards = (1..num_frames.saturating_sub(1)).rev();
                Box::new(forwards.chain(backwards).cycle())
            }
        };
        Self { frames, index }
    }

    /// Load a recording from a TOML file with a `frames` array.
    pub(crate) fn from_path(path: &Path, repeat: RepeatMode) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read recorded frames from {}", path.display()))?;
        let recording: Recording = toml::from_str(&data)
            .with_context(|| format!("Invalid frame recording in {}", path.display()))?;
        ensure!(
            !recording.frames.is_empty(),
            "No frames in recording {}",
            path.display()
        );
        Ok(Self::new(recording.frames, repeat))
    }
}

impl ThermalCamera for MockCamera {
    fn read_subframe(&mut self, image: &mut ThermalImage) -> anyhow::Result<Temperature> {
        let index = self
            .index
            .next()
            .ok_or_else(|| anyhow!("No more frames in recording"))?;
        let frame = &self.frames[index];
        ensure!(
            frame.image.dimensions() == image.dimensions(),
            "Recorded frame {} is {:?}, expected {:?}",
            index,
            frame.image.dimensions(),
            image.dimensions()
        );
        image.copy_from_slice(&frame.image);
        trace!(index, "Played back recorded frame");
        Ok(frame.ambient)
    }
}
