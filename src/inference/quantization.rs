// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::fmt;

use anyhow::ensure;
use serde::Deserialize;

use crate::image_buffer::GrayImage;

/// The scale mapping a full-range grayscale sample (1.0 after dividing by 255) onto 255 steps.
const DEFAULT_SCALE: f32 = 0.003921569;

const DEFAULT_ZERO_POINT: i32 = -128;

/// The quantization step size for a model's input tensor. Always positive and finite.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(try_from = "f32")]
pub(crate) struct Scale(f32);

impl TryFrom<f32> for Scale {
    type Error = anyhow::Error;

    fn try_from(scale: f32) -> anyhow::Result<Self> {
        ensure!(
            scale.is_finite() && scale > 0.0,
            "quantization scale must be a positive number, not {}",
            scale
        );
        Ok(Self(scale))
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self(DEFAULT_SCALE)
    }
}

impl From<Scale> for f32 {
    fn from(scale: Scale) -> Self {
        scale.0
    }
}

pub(crate) fn default_zero_point() -> i32 {
    DEFAULT_ZERO_POINT
}

/// Affine int8 quantization parameters for a model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Quantization {
    scale: Scale,
    zero_point: i32,
}

impl Quantization {
    pub(crate) fn new(scale: Scale, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }

    /// Quantize a single grayscale sample.
    ///
    /// The sample is first scaled to [0, 1], then divided by the scale, rounded (half away from
    /// zero), offset by the zero point and finally saturated to the int8 range.
    pub(crate) fn quantize(&self, level: u8) -> i8 {
        let normalized = f32::from(level) / 255.0;
        let steps = (normalized / self.scale.0).round() as i64;
        (steps + i64::from(self.zero_point)).clamp(i8::MIN.into(), i8::MAX.into()) as i8
    }

    /// Quantize every sample of `image` into `input`, replacing its previous contents.
    ///
    /// The allocation backing `input` is kept, so the same buffer can be reused every cycle.
    pub(crate) fn quantize_image(&self, image: &GrayImage, input: &mut Vec<i8>) {
        input.clear();
        input.extend(image.as_raw().iter().map(|level| self.quantize(*level)));
    }
}

impl Default for Quantization {
    fn default() -> Self {
        Self::new(Scale::default(), DEFAULT_ZERO_POINT)
    }
}

/// The result of classifying a single image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Classification {
    pub(crate) fire: bool,
    pub(crate) no_fire_logit: i8,
    pub(crate) fire_logit: i8,
}

impl Classification {
    /// Interpret the two output logits of the classifier.
    ///
    /// Fire is only reported when its logit is strictly greater, so ties are "no fire".
    pub(crate) fn from_logits(no_fire: i8, fire: i8) -> Self {
        Self {
            fire: fire > no_fire,
            no_fire_logit: no_fire,
            fire_logit: fire,
        }
    }

    /// The value of the `fire` form field.
    pub(crate) fn form_value(&self) -> &'static str {
        if self.fire {
            "1"
        } else {
            "0"
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fire {
            write!(f, "fire")
        } else {
            write!(f, "no fire")
        }
    }
}
