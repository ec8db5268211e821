// SPDX-License-Identifier: GPL-3.0-or-later
use image::{ImageBuffer, Luma};

pub(crate) use image::GrayImage;

/// Images where each point is a temperature in degrees Celsius.
pub(crate) type ThermalImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Width of an MLX90640 frame, in pixels.
pub(crate) const FRAME_WIDTH: u32 = 32;

/// Height of an MLX90640 frame, in pixels.
pub(crate) const FRAME_HEIGHT: u32 = 24;
