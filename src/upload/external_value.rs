// SPDX-License-Identifier: GPL-3.0-or-later
use serde::Deserialize;
use tracing::debug;

use std::convert::TryFrom;
use std::fmt;
use std::path::PathBuf;

/// A secret that can be deserialized either from a string or a path to a file.
///
/// If just a plain string is present, that value is used. If a map with a key 'file' with a string
/// value is provided, the inner string value is taken as a path to a file, the contents of which
/// are read and used as the final value. Trailing whitespace (like the newline most editors add)
/// is removed from values read from files.
#[derive(Clone, Deserialize, PartialEq)]
#[serde(try_from = "InnerExternalValue")]
pub(crate) struct ExternalValue(String);

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum InnerExternalValue {
    File { file: PathBuf },

    String(String),
}

impl ExternalValue {
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<ExternalValue> for String {
    fn from(value: ExternalValue) -> Self {
        value.0
    }
}

impl TryFrom<InnerExternalValue> for ExternalValue {
    type Error = std::io::Error;

    fn try_from(inner: InnerExternalValue) -> std::io::Result<Self> {
        match inner {
            InnerExternalValue::File { file } => {
                debug!("Reading secret from {:?}", file);
                let contents = std::fs::read_to_string(file)?;
                Ok(Self(contents.trim_end().to_string()))
            }
            InnerExternalValue::String(s) => {
                debug!("Using secret directly");
                Ok(Self(s))
            }
        }
    }
}

// Secrets should never end up in the logs.
impl fmt::Debug for ExternalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExternalValue(<redacted>)")
    }
}
