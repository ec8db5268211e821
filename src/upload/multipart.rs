// SPDX-License-Identifier: GPL-3.0-or-later
//! `multipart/form-data` bodies (RFC 7578) built from a list of parts.
//!
//! The body is kept as a list of [`Bytes`] segments so that large file parts are never copied;
//! only the framing around them is newly allocated.
use std::convert::TryFrom;
use std::fmt;

use anyhow::ensure;
use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;

use crate::inference::Classification;
use crate::render::Bitmap;

const DEFAULT_BOUNDARY: &str = "----FireWatchBoundary";

/// Characters allowed in a boundary by RFC 2046, section 5.1.1.
fn is_boundary_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c)
}

/// The delimiter between the parts of a multipart body.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String")]
pub(crate) struct Boundary(String);

impl TryFrom<String> for Boundary {
    type Error = anyhow::Error;

    fn try_from(boundary: String) -> anyhow::Result<Self> {
        ensure!(
            !boundary.is_empty() && boundary.len() <= 70,
            "a multipart boundary must be between 1 and 70 characters long"
        );
        ensure!(
            boundary.chars().all(is_boundary_char),
            "'{}' contains characters not allowed in a multipart boundary",
            boundary
        );
        ensure!(
            !boundary.ends_with(' '),
            "a multipart boundary cannot end with a space"
        );
        Ok(Self(boundary))
    }
}

impl TryFrom<&str> for Boundary {
    type Error = anyhow::Error;

    fn try_from(boundary: &str) -> anyhow::Result<Self> {
        Self::try_from(boundary.to_string())
    }
}

impl Default for Boundary {
    fn default() -> Self {
        Self(DEFAULT_BOUNDARY.to_string())
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug)]
enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        data: Bytes,
    },
}

/// An ordered list of form fields.
#[derive(Clone, Debug)]
pub(crate) struct MultipartForm {
    boundary: Boundary,
    parts: Vec<Part>,
}

impl MultipartForm {
    pub(crate) fn new(boundary: Boundary) -> Self {
        Self {
            boundary,
            parts: Vec::new(),
        }
    }

    /// Append a plain text field.
    pub(crate) fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(Part::Text {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    /// Append a file field. `data` is sent as-is.
    pub(crate) fn file(
        mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Self {
        self.parts.push(Part::File {
            name: name.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data,
        });
        self
    }

    pub(crate) fn build(self) -> MultipartBody {
        let boundary = self.boundary.0;
        let mut segments = Vec::new();
        let mut framing = BytesMut::new();
        for part in self.parts {
            framing.put_slice(b"--");
            framing.put_slice(boundary.as_bytes());
            framing.put_slice(b"\r\n");
            match part {
                Part::Text { name, value } => {
                    framing.put_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    framing.put_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    framing.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            name, filename
                        )
                        .as_bytes(),
                    );
                    framing.put_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
                    segments.push(framing.split().freeze());
                    if !data.is_empty() {
                        segments.push(data);
                    }
                }
            }
            framing.put_slice(b"\r\n");
        }
        framing.put_slice(b"--");
        framing.put_slice(boundary.as_bytes());
        framing.put_slice(b"--\r\n");
        segments.push(framing.freeze());
        MultipartBody {
            content_type: format!("multipart/form-data; boundary={}", boundary),
            segments,
        }
    }
}

/// A complete multipart body, ready to be written out segment by segment.
#[derive(Clone, Debug)]
pub(crate) struct MultipartBody {
    content_type: String,
    segments: Vec<Bytes>,
}

impl MultipartBody {
    /// The value for the `Content-Type` header, including the boundary.
    pub(crate) fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The exact number of bytes in the body.
    pub(crate) fn content_length(&self) -> u64 {
        self.segments.iter().map(|s| s.len() as u64).sum()
    }

    pub(crate) fn segments(&self) -> &[Bytes] {
        &self.segments
    }

    #[cfg(test)]
    pub(crate) fn to_vec(&self) -> Vec<u8> {
        self.segments.concat()
    }
}

/// Build the form sent to the collector: the API key, the classification and the image, in that
/// order.
pub(crate) fn upload_form(
    api_key: &str,
    classification: &Classification,
    bitmap: &Bitmap,
    boundary: &Boundary,
) -> MultipartBody {
    MultipartForm::new(boundary.clone())
        .text("api_key", api_key)
        .text("fire", classification.form_value())
        .file("file", "image.bmp", "image/bmp", bitmap.to_bytes())
        .build()
}
