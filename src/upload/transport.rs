// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, bail, ensure, Context as _};
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::{Request, StatusCode};
use hyper::client::conn::{self, ResponseFuture};
use hyper::Body;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_rustls::rustls::ClientConfig;
use tracing::{debug, trace};

use std::fs::File;
use std::future::Future;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::multipart::MultipartBody;
use super::settings::{UploadSettings, UploadUrl};
use super::stream;

/// Something that can carry a request body to the collector.
pub(crate) trait Transport {
    /// Start a request. The length of the body has to be known up front.
    fn open(
        &mut self,
        content_type: &str,
        content_length: u64,
    ) -> anyhow::Result<Box<dyn Upload + '_>>;
}

/// A request in progress. Dropping it closes the connection.
pub(crate) trait Upload {
    /// Send the next chunk of the body.
    fn write(&mut self, data: Bytes) -> anyhow::Result<()>;

    /// Finish the body and wait for the response status.
    fn fetch_status(self: Box<Self>) -> anyhow::Result<StatusCode>;
}

/// Send a complete multipart body, treating anything but a 2xx response as an error.
pub(crate) fn send_body(
    transport: &mut dyn Transport,
    body: &MultipartBody,
) -> anyhow::Result<StatusCode> {
    let mut upload = transport.open(body.content_type(), body.content_length())?;
    for segment in body.segments() {
        upload.write(segment.clone())?;
    }
    let status = upload.fetch_status()?;
    if !status.is_success() {
        bail!("Collector responded with {}", status);
    }
    Ok(status)
}

/// HTTP/1.1 over TCP or TLS, run on a private single threaded runtime.
///
/// Each call blocks until it completes or the configured timeout elapses.
pub(crate) struct HttpTransport {
    runtime: Runtime,
    url: UploadUrl,
    tls_config: Arc<ClientConfig>,
    timeout: Duration,
}

fn tls_config(ca_certificate: Option<&Path>) -> anyhow::Result<ClientConfig> {
    let mut tls_config = ClientConfig::new();
    tls_config
        .root_store
        .add_server_trust_anchors(&webpki_roots::TLS_SERVER_ROOTS);
    if let Some(path) = ca_certificate {
        let file = File::open(path)
            .with_context(|| format!("Unable to open CA certificate {}", path.display()))?;
        let (added, _) = tls_config
            .root_store
            .add_pem_file(&mut BufReader::new(file))
            .map_err(|_| anyhow!("Unable to parse CA certificates in {}", path.display()))?;
        ensure!(added > 0, "No usable certificates in {}", path.display());
        debug!(count = added, path = %path.display(), "Added trusted certificates");
    }
    Ok(tls_config)
}

impl HttpTransport {
    pub(crate) fn new(settings: &UploadSettings) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Unable to create the upload runtime")?;
        let tls_config = tls_config(settings.ca_certificate.as_deref())?;
        Ok(Self {
            runtime,
            url: settings.url.clone(),
            tls_config: Arc::new(tls_config),
            timeout: settings.timeout(),
        })
    }

    /// Run `future` to completion on the transport's runtime, giving up after the timeout.
    fn block_on<F: Future>(&self, future: F, action: &str) -> anyhow::Result<F::Output> {
        block_on_timeout(&self.runtime, self.timeout, future, action)
    }
}

fn block_on_timeout<F: Future>(
    runtime: &Runtime,
    timeout: Duration,
    future: F,
    action: &str,
) -> anyhow::Result<F::Output> {
    // The timer has to be created inside the runtime.
    runtime
        .block_on(async { time::timeout(timeout, future).await })
        .map_err(|_| anyhow!("Timed out {} after {:?}", action, timeout))
}

impl Transport for HttpTransport {
    fn open(
        &mut self,
        content_type: &str,
        content_length: u64,
    ) -> anyhow::Result<Box<dyn Upload + '_>> {
        let io = self.block_on(
            stream::connect(self.url.clone(), Arc::clone(&self.tls_config)),
            "connecting",
        )??;
        let (mut sender, connection) = self
            .block_on(conn::handshake(io), "starting HTTP connection")?
            .context("HTTP handshake failed")?;
        let connection = self.runtime.spawn(async move {
            if let Err(err) = connection.await {
                debug!(error = ?err, "Upload connection closed with an error");
            }
        });
        let (body, request_body) = Body::channel();
        let request = Request::post(self.url.request_target())
            .header(HOST, self.url.authority())
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, content_length)
            .body(request_body)
            .context("Unable to create upload request")?;
        let response = sender.send_request(request);
        trace!(url = %self.url, content_length, "Opened upload");
        Ok(Box::new(HttpUpload {
            runtime: &self.runtime,
            timeout: self.timeout,
            body: Some(body),
            response: Some(response),
            connection,
            declared_length: content_length,
            written: 0,
        }))
    }
}

struct HttpUpload<'a> {
    runtime: &'a Runtime,
    timeout: Duration,
    body: Option<hyper::body::Sender>,
    response: Option<ResponseFuture>,
    connection: JoinHandle<()>,
    declared_length: u64,
    written: u64,
}

impl Upload for HttpUpload<'_> {
    fn write(&mut self, data: Bytes) -> anyhow::Result<()> {
        let length = data.len() as u64;
        ensure!(
            self.written + length <= self.declared_length,
            "Writing {} more bytes would exceed the declared length of {}",
            length,
            self.declared_length
        );
        let body = self
            .body
            .as_mut()
            .ok_or_else(|| anyhow!("Upload body already finished"))?;
        block_on_timeout(
            self.runtime,
            self.timeout,
            body.send_data(data),
            "sending upload data",
        )?
        .context("Unable to send upload data")?;
        self.written += length;
        Ok(())
    }

    fn fetch_status(mut self: Box<Self>) -> anyhow::Result<StatusCode> {
        ensure!(
            self.written == self.declared_length,
            "Only {} of the declared {} bytes were written",
            self.written,
            self.declared_length
        );
        // Dropping the sender ends the body.
        self.body.take();
        let response = self
            .response
            .take()
            .ok_or_else(|| anyhow!("Upload response already fetched"))?;
        let response = block_on_timeout(
            self.runtime,
            self.timeout,
            response,
            "waiting for the upload response",
        )?
        .context("Upload request failed")?;
        let status = response.status();
        match block_on_timeout(
            self.runtime,
            self.timeout,
            hyper::body::to_bytes(response.into_body()),
            "reading the upload response",
        ) {
            Ok(Ok(body)) => debug!(
                %status,
                body = %String::from_utf8_lossy(&body),
                "Collector response"
            ),
            Ok(Err(err)) => debug!(%status, error = ?err, "Unable to read collector response"),
            Err(err) => debug!(%status, error = ?err, "Unable to read collector response"),
        }
        Ok(status)
    }
}

impl Drop for HttpUpload<'_> {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use bytes::Bytes;
    use http::StatusCode;

    use crate::upload::multipart::{Boundary, MultipartForm};
    use crate::upload::settings::UploadSettings;

    use super::{send_body, HttpTransport, Transport};

    fn settings_for(url: &str) -> UploadSettings {
        toml::from_str(&format!(
            r#"
            url = "{}"
            api_key = "test-key"
            timeout = 5
            "#,
            url
        ))
        .expect("test upload settings to parse")
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    /// Read a single request from `stream`, returning the head (lowercased) and body.
    fn read_request(stream: &mut TcpStream) -> (String, Vec<u8>) {
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        let head_end = loop {
            if let Some(end) = find(&received, b"\r\n\r\n") {
                break end + 4;
            }
            let count = stream.read(&mut buf).unwrap();
            assert!(count > 0, "connection closed before the request head");
            received.extend_from_slice(&buf[..count]);
        };
        let head = String::from_utf8_lossy(&received[..head_end]).to_ascii_lowercase();
        let content_length: usize = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|value| value.trim().parse().unwrap())
            .unwrap_or(0);
        while received.len() < head_end + content_length {
            let count = stream.read(&mut buf).unwrap();
            assert!(count > 0, "connection closed before the request body");
            received.extend_from_slice(&buf[..count]);
        }
        let body = received[head_end..].to_vec();
        (head, body)
    }

    /// Accept one connection, reply with `response` and hand back what was received.
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<(String, Vec<u8>)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!(
            "http://{}/fmon/post-file.php",
            listener.local_addr().unwrap()
        );
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });
        (url, handle)
    }

    /// Accept one connection and read from it until it is closed.
    fn sink_server() -> (String, thread::JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/post", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            // The client aborting the connection may show up as a reset.
            let _ = stream.read_to_end(&mut received);
            received.len()
        });
        (url, handle)
    }

    fn test_body() -> crate::upload::multipart::MultipartBody {
        MultipartForm::new(Boundary::default())
            .text("api_key", "test-key")
            .text("fire", "1")
            .file(
                "file",
                "image.bmp",
                "image/bmp",
                Bytes::from_static(b"BM\x00\x01\x02"),
            )
            .build()
    }

    #[test]
    fn post_to_loopback() {
        let (url, server) = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok");
        let mut transport = HttpTransport::new(&settings_for(&url)).unwrap();
        let body = test_body();
        let status = send_body(&mut transport, &body).expect("the upload to succeed");
        assert_eq!(status, StatusCode::OK);
        let (head, received) = server.join().unwrap();
        assert!(head.starts_with("post /fmon/post-file.php http/1.1\r\n"), "{}", head);
        assert!(head.contains(&format!("content-length: {}\r\n", body.content_length())));
        assert!(head.contains(
            "content-type: multipart/form-data; boundary=----firewatchboundary\r\n"
        ));
        assert!(head.contains("host: 127.0.0.1:"));
        assert_eq!(received, body.to_vec());
    }

    #[test]
    fn server_error_is_failure() {
        let (url, server) =
            serve_once("HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n");
        let mut transport = HttpTransport::new(&settings_for(&url)).unwrap();
        let result = send_body(&mut transport, &test_body());
        assert!(result.is_err());
        server.join().unwrap();
    }

    #[test]
    fn connection_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{}/post", port);
        let mut transport = HttpTransport::new(&settings_for(&url)).unwrap();
        assert!(transport.open("text/plain", 4).is_err());
    }

    #[test]
    fn short_body_rejected() {
        let (url, server) = sink_server();
        let mut transport = HttpTransport::new(&settings_for(&url)).unwrap();
        let mut upload = transport.open("text/plain", 10).unwrap();
        upload.write(Bytes::from_static(b"abc")).unwrap();
        assert!(upload.write(Bytes::from_static(b"too long!")).is_err());
        assert!(upload.fetch_status().is_err());
        drop(transport);
        server.join().unwrap();
    }

    #[test]
    fn missing_ca_certificate() {
        let mut settings = settings_for("https://example.com/post-file.php");
        settings.ca_certificate = Some("/nonexistent/ca.pem".into());
        assert!(HttpTransport::new(&settings).is_err());
    }
}
