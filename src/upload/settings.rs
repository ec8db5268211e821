// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::anyhow;
use serde::Deserialize;
use url::{Host, Url};

use std::convert::{TryFrom, TryInto};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::external_value::ExternalValue;
use super::multipart::Boundary;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

#[derive(Debug, Deserialize, PartialEq)]
pub(crate) struct UploadSettings {
    /// The URL the form is POSTed to. Only 'http' and 'https' URLs are accepted.
    pub(crate) url: UploadUrl,

    /// The API key sent along with every upload.
    ///
    /// This configuration value can be given either as a plain string, or as a map/object of a
    /// key "file" to a string. In the second case the file is read and its contents used as the
    /// key.
    pub(crate) api_key: ExternalValue,

    /// The boundary between the parts of the multipart form.
    #[serde(default)]
    pub(crate) boundary: Boundary,

    /// A PEM file with extra certificates to trust, in addition to the usual web roots.
    #[serde(default)]
    pub(crate) ca_certificate: Option<PathBuf>,

    /// How long to wait on each network operation, in seconds.
    #[serde(default = "default_timeout")]
    timeout: u64,
}

impl UploadSettings {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// An 'http' or 'https' URL with a host.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(try_from = "Url")]
pub(crate) struct UploadUrl(Url);

impl TryFrom<Url> for UploadUrl {
    type Error = anyhow::Error;

    fn try_from(url: Url) -> anyhow::Result<Self> {
        match url.scheme() {
            "http" | "https" => (),
            invalid => return Err(anyhow!("invalid scheme '{}'", invalid)),
        }
        if url.host_str().is_none() {
            return Err(anyhow!("upload URL '{}' is missing a host", url));
        }
        Ok(Self(url))
    }
}

impl FromStr for UploadUrl {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let url: Url = s.parse()?;
        url.try_into()
    }
}

impl UploadUrl {
    pub(crate) fn is_encrypted(&self) -> bool {
        self.0.scheme() == "https"
    }

    /// The host to connect to. IPv6 addresses are given without their brackets.
    pub(crate) fn host(&self) -> &str {
        // Checked when created
        let host = self.0.host_str().unwrap_or_default();
        match self.0.host() {
            Some(Host::Ipv6(_)) => host.trim_start_matches('[').trim_end_matches(']'),
            _ => host,
        }
    }

    /// The port to connect to, using the scheme's default when none is given.
    pub(crate) fn port(&self) -> u16 {
        self.0
            .port_or_known_default()
            .unwrap_or(if self.is_encrypted() { 443 } else { 80 })
    }

    /// The value for the `Host` header.
    pub(crate) fn authority(&self) -> String {
        let host = self.0.host_str().unwrap_or_default();
        match self.0.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// The path and query, as used in the request line.
    pub(crate) fn request_target(&self) -> &str {
        &self.0[url::Position::BeforePath..]
    }
}

impl std::fmt::Display for UploadUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
