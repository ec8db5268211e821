// SPDX-License-Identifier: GPL-3.0-or-later
use std::error::Error as StdError;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, ensure, Context as _};
use embedded_hal::blocking::i2c;
use tracing::trace;

use crate::image_buffer::ThermalImage;
use crate::temperature::Temperature;

/// The operations a thermal camera needs to have to be used by fire-watch.
pub(crate) trait ThermalCamera {
    /// Wait for the next subframe from the camera and read it into `image`.
    ///
    /// `image` is reused between reads. Cameras that only refresh part of the image with each
    /// subframe (like the MLX90640 in its default chess pattern mode) leave the other pixels as
    /// they were. The ambient temperature of the camera is returned.
    fn read_subframe(&mut self, image: &mut ThermalImage) -> anyhow::Result<Temperature>;
}

/// The shortest time to sleep between checks for new data.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Call `poll` until it reports that new data was read, sleeping `interval` between calls.
///
/// Gives up with an error once `timeout` has passed without new data.
pub(crate) fn wait_for_subframe<F>(
    mut poll: F,
    interval: Duration,
    timeout: Duration,
) -> anyhow::Result<()>
where
    F: FnMut() -> anyhow::Result<bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if poll()? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!("No new subframe within {:?}", timeout);
        }
        thread::sleep(interval);
    }
}

pub(crate) struct Mlx90640<I2C> {
    camera: mlx9064x::Mlx90640Driver<I2C>,

    /// How long the camera takes to measure one subpage.
    subframe_period: Duration,
}

impl<I2C> Mlx90640<I2C>
where
    I2C: 'static + i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: 'static + StdError + Sync + Send,
    <I2C as i2c::Write>::Error: 'static + StdError + Sync + Send,
{
    /// Wrap an MLX90640 driver.
    ///
    /// The calibration data is read from the camera's EEPROM and extracted when the driver is
    /// created, so any calibration problems have already been reported by this point.
    pub(crate) fn new(mut camera: mlx9064x::Mlx90640Driver<I2C>) -> anyhow::Result<Self> {
        let frame_rate = camera
            .frame_rate()
            .context("Unable to read the MLX90640 frame rate")?;
        Ok(Self {
            camera,
            subframe_period: frame_rate.into(),
        })
    }

    pub(crate) fn set_frame_rate(&mut self, frame_rate: mlx9064x::FrameRate) -> anyhow::Result<()> {
        self.camera
            .set_frame_rate(frame_rate)
            .context("Error setting camera frame rate")?;
        self.subframe_period = frame_rate.into();
        Ok(())
    }
}

impl<I2C> ThermalCamera for Mlx90640<I2C>
where
    I2C: 'static + i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: 'static + StdError + Sync + Send,
    <I2C as i2c::Write>::Error: 'static + StdError + Sync + Send,
{
    fn read_subframe(&mut self, image: &mut ThermalImage) -> anyhow::Result<Temperature> {
        let expected = (self.camera.width() as u32, self.camera.height() as u32);
        ensure!(
            image.dimensions() == expected,
            "Frame buffer is {:?}, but the MLX90640 produces {:?} images",
            image.dimensions(),
            expected
        );
        // The data ready flag is cleared after every read, so consecutive reads get alternating
        // subpages. Waiting up to two periods covers a measurement that was just starting.
        let interval = (self.subframe_period / 16).max(MIN_POLL_INTERVAL);
        let timeout = self.subframe_period * 2;
        let camera = &mut self.camera;
        // mlx9064x uses row-major ordering, same as ImageBuffer, so the raw buffer can be
        // written to directly.
        let buffer: &mut [f32] = &mut **image;
        wait_for_subframe(
            || {
                camera
                    .generate_image_if_ready(&mut *buffer)
                    .context("Unable to read a subframe from the MLX90640")
            },
            interval,
            timeout,
        )?;
        let ambient = self
            .camera
            .ambient_temperature()
            .ok_or_else(|| anyhow!("MLX90640 did not report an ambient temperature"))?;
        trace!(ambient, "Read MLX90640 subframe");
        Ok(Temperature::Celsius(ambient))
    }
}
