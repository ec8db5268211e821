// SPDX-License-Identifier: GPL-3.0-or-later
use std::time::Duration;

use anyhow::Context as _;
use linux_embedded_hal::sysfs_gpio::Direction;
use linux_embedded_hal::SysfsPin;
use serde::Deserialize;

/// The GPIO lines watched by default.
const DEFAULT_PINS: [u64; 2] = [32, 26];

const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

fn default_pins() -> [u64; 2] {
    DEFAULT_PINS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct TriggerSettings {
    /// The sysfs GPIO numbers of the two trigger lines.
    #[serde(default = "default_pins")]
    pub(crate) pins: [u64; 2],

    /// Time between polls of the trigger lines, in milliseconds.
    #[serde(default = "default_poll_interval")]
    poll_interval: u64,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            pins: DEFAULT_PINS,
            poll_interval: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

fn open_pin(number: u64) -> anyhow::Result<SysfsPin> {
    let pin = SysfsPin::new(number);
    pin.export()
        .with_context(|| format!("Unable to export GPIO {}", number))?;
    pin.set_direction(Direction::In)
        .with_context(|| format!("Unable to set GPIO {} as an input", number))?;
    Ok(pin)
}

impl TriggerSettings {
    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    /// Export the trigger lines and configure them as inputs.
    pub(crate) fn open_pins(&self) -> anyhow::Result<[SysfsPin; 2]> {
        Ok([open_pin(self.pins[0])?, open_pin(self.pins[1])?])
    }
}
