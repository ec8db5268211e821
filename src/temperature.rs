// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;

use serde::Deserialize;

#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
        })
    }
}

/// A temperature with its unit attached.
///
/// Configuration files can give either a bare number (taken as Celsius) or a map of a unit to a
/// number, like `{ fahrenheit = 68 }`.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(from = "DeserializedTemperature")]
pub(crate) enum Temperature {
    Celsius(f32),
    Fahrenheit(f32),
}

impl Temperature {
    /// Get the temperature in Celsius.
    pub(crate) fn in_celsius(&self) -> f32 {
        match *self {
            Self::Celsius(c) => c,
            Self::Fahrenheit(f) => (f - 32.0) * 5.0 / 9.0,
        }
    }

    pub(crate) fn unit(&self) -> TemperatureUnit {
        match self {
            Temperature::Celsius(_) => TemperatureUnit::Celsius,
            Temperature::Fahrenheit(_) => TemperatureUnit::Fahrenheit,
        }
    }

    fn value(&self) -> f32 {
        match *self {
            Temperature::Celsius(c) => c,
            Temperature::Fahrenheit(f) => f,
        }
    }
}

impl PartialEq for Temperature {
    fn eq(&self, other: &Self) -> bool {
        // Always compare in celsius.
        self.in_celsius().eq(&other.in_celsius())
    }
}

impl fmt::Display for Temperature {
    /// Format the temperature value like a numeric value. If the alternate formatting flag (`#`)
    /// is specified, the degree symbol and the unit (ex: `°C`) are also printed.
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value(), fmt)?;
        if fmt.alternate() {
            write!(fmt, "°{}", self.unit())?;
        }
        Ok(())
    }
}

impl From<f32> for Temperature {
    fn from(value: f32) -> Self {
        Self::Celsius(value)
    }
}

// Lets serde accept either a raw number or a map of a unit to a number without implementing
// Deserialize by hand.
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(untagged)]
enum DeserializedTemperature {
    Number(f32),
    Wrapped(WrappedTemperature),
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WrappedTemperature {
    #[serde(alias = "c", alias = "C")]
    Celsius(f32),

    #[serde(alias = "f", alias = "F")]
    Fahrenheit(f32),
}

impl From<DeserializedTemperature> for Temperature {
    fn from(maybe_wrapped: DeserializedTemperature) -> Self {
        match maybe_wrapped {
            DeserializedTemperature::Number(temperature) => Self::Celsius(temperature),
            DeserializedTemperature::Wrapped(WrappedTemperature::Celsius(c)) => Self::Celsius(c),
            DeserializedTemperature::Wrapped(WrappedTemperature::Fahrenheit(f)) => {
                Self::Fahrenheit(f)
            }
        }
    }
}
