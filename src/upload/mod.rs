// SPDX-License-Identifier: GPL-3.0-or-later
mod external_value;
mod multipart;
mod settings;
mod stream;
mod transport;

pub(crate) use multipart::{upload_form, Boundary};
pub(crate) use settings::UploadSettings;
pub(crate) use transport::{send_body, HttpTransport, Transport};
#[cfg(test)]
pub(crate) use transport::Upload;
