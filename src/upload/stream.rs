// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, Context as _};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::webpki;
use tokio_rustls::TlsConnector;
use tracing::trace;

use std::sync::Arc;

use super::settings::UploadUrl;

/// Anything a request can be written to and a response read from.
pub(crate) trait UploadIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> UploadIo for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// A connection to the collector. Plain TCP and TLS streams look the same to the HTTP client.
pub(crate) type UploadStream = Box<dyn UploadIo>;

/// Open a connection to the host in `url`, wrapping it in TLS for 'https' URLs.
pub(crate) async fn connect(
    url: UploadUrl,
    tls_config: Arc<ClientConfig>,
) -> anyhow::Result<UploadStream> {
    let tcp_stream = TcpStream::connect((url.host(), url.port()))
        .await
        .with_context(|| format!("Unable to connect to {}", url.authority()))?;
    // Small requests, no point in waiting to fill a segment.
    tcp_stream.set_nodelay(true)?;
    if !url.is_encrypted() {
        trace!(authority = %url.authority(), "Connected without TLS");
        return Ok(Box::new(tcp_stream));
    }
    let dns_name = webpki::DNSNameRef::try_from_ascii_str(url.host())
        .map_err(|_| anyhow!("'{}' is not a valid DNS name", url.host()))?;
    let tls_stream = TlsConnector::from(tls_config)
        .connect(dns_name, tcp_stream)
        .await
        .context("TLS handshake failed")?;
    trace!(authority = %url.authority(), "Connected with TLS");
    Ok(Box::new(tls_stream))
}
