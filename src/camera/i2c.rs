// SPDX-License-Identifier: GPL-3.0-or-later
use i2cdev::linux::LinuxI2CError;
use linux_embedded_hal::I2cdev;
use serde::Deserialize;

use std::convert::TryFrom;
use std::fmt;
use std::path::PathBuf;

/// An I2C bus, either as the bus number or the path to the device file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum Bus {
    Number(u32),
    Path(PathBuf),
}

impl Bus {
    fn device_path(&self) -> PathBuf {
        match self {
            Bus::Number(n) => PathBuf::from(format!("/dev/i2c-{}", n)),
            Bus::Path(p) => p.clone(),
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl From<u32> for Bus {
    fn from(bus: u32) -> Self {
        Self::Number(bus)
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device_path().display())
    }
}

impl TryFrom<&Bus> for I2cdev {
    type Error = LinuxI2CError;

    fn try_from(bus: &Bus) -> Result<Self, Self::Error> {
        I2cdev::new(bus.device_path())
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use serde::Deserialize;

    use super::Bus;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        bus: Bus,
    }

    #[test]
    fn bus_from_num() {
        assert_eq!(Bus::from(0), Bus::Number(0))
    }

    #[test]
    fn bus_num_from_toml() {
        let parsed: Wrapper = toml::from_str("bus = 3").expect("a bus number to parse");
        assert_eq!(parsed.bus, Bus::Number(3));
        assert_eq!(parsed.bus.to_string(), "/dev/i2c-3");
    }

    #[test]
    fn bus_path_from_toml() {
        let parsed: Wrapper = toml::from_str(r#"bus = "/dev/i2c-7""#).expect("a bus path to parse");
        assert_eq!(parsed.bus, Bus::Path(PathBuf::from("/dev/i2c-7")));
    }
}
