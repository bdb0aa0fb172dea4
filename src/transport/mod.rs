//! Resilient HTTP transport for remote audio assets.
//!
//! [`Fetcher`] downloads provider audio and background-music assets with the
//! guard rails a misbehaving or malicious server requires:
//!
//! - non-HTTP(S) schemes are rejected before any network call
//! - a HEAD probe checks the declared content type and size up front
//! - the body is streamed chunk-by-chunk into a `<destination>.tmp` sibling
//!   and the download aborts the instant the byte ceiling is crossed
//! - the byte count is verified against the declared size before the
//!   temporary file is atomically renamed onto the destination
//! - transient HTTP statuses (429/5xx) are retried with exponential backoff
//!   inside the transport, independent of the synthesis-level retry protocol
//!
//! Every failure surfaces as [`Error::Transport`]; partial files never
//! survive a failed fetch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// Hard ceiling on a single downloaded asset (100 MB).
pub const MAX_DOWNLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Per-request timeout for downloads and probes.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Retries for transient HTTP statuses before giving up.
const MAX_TRANSIENT_RETRIES: u32 = 3;

/// Base delay for exponential backoff between transient retries.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Outcome of a successful fetch.
#[derive(Debug, Clone, Copy)]
pub struct Downloaded {
    /// Bytes written to the destination file.
    pub bytes_written: u64,
}

/// Pooled HTTP fetcher for remote audio assets.
///
/// Cheap to clone; all clones share the underlying connection pool.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher sharing the given pooled client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Downloads `url` to `destination`.
    ///
    /// On success the destination file holds the complete, size-verified
    /// body. On any failure no file remains at the destination path and the
    /// temporary sibling has been removed.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<Downloaded> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::transport(url, format!("invalid url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::transport(
                url,
                format!("unsupported url scheme '{}'", parsed.scheme()),
            ));
        }

        // Metadata probe: declared type and size, before committing to the body.
        let probe_len = self.probe(url).await?;

        let response = self.get_with_retry(url).await?;
        // The probe's declaration is authoritative; the GET header fills in
        // when the server answered HEAD without a length.
        let declared_len = probe_len.or_else(|| declared_length(response.headers()));
        if let Some(len) = declared_len {
            if len > MAX_DOWNLOAD_BYTES {
                return Err(Error::transport(
                    url,
                    format!(
                        "declared size {} exceeds the {} byte ceiling",
                        len, MAX_DOWNLOAD_BYTES
                    ),
                ));
            }
        }
        debug!(url, ?declared_len, "streaming download started");

        let tmp_path = tmp_sibling(destination);
        let result = self
            .stream_to_file(url, response, &tmp_path, declared_len)
            .await;

        match result {
            Ok(bytes_written) => {
                tokio::fs::rename(&tmp_path, destination).await.map_err(|e| {
                    Error::transport(url, format!("failed to finalize download: {e}"))
                })?;
                debug!(url, bytes_written, "download complete");
                Ok(Downloaded { bytes_written })
            }
            Err(err) => {
                // Never leave a partial file behind.
                let _ = tokio::fs::remove_file(&tmp_path).await;
                Err(err)
            }
        }
    }

    /// HEAD-equivalent probe. Returns the declared content length, if any.
    async fn probe(&self, url: &str) -> Result<Option<u64>> {
        let response = self
            .request_with_retry(url, || {
                self.client.head(url).timeout(DOWNLOAD_TIMEOUT)
            })
            .await?;

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_acceptable_content_type(content_type) {
                return Err(Error::transport(
                    url,
                    format!("unexpected content type '{content_type}'"),
                ));
            }
        }

        // The Content-Length header, not the body size hint: a HEAD response
        // carries no body, so `Response::content_length()` reports 0 here.
        let declared_len = declared_length(response.headers());
        if let Some(len) = declared_len {
            if len > MAX_DOWNLOAD_BYTES {
                return Err(Error::transport(
                    url,
                    format!(
                        "declared size {} exceeds the {} byte ceiling",
                        len, MAX_DOWNLOAD_BYTES
                    ),
                ));
            }
        }
        Ok(declared_len)
    }

    async fn get_with_retry(&self, url: &str) -> Result<Response> {
        self.request_with_retry(url, || self.client.get(url).timeout(DOWNLOAD_TIMEOUT))
            .await
    }

    /// Issues a request, retrying transient statuses with exponential backoff.
    async fn request_with_retry<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            let outcome = build().send().await;
            match outcome {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if is_transient_status(response.status()) => {
                    let status = response.status();
                    if attempt >= MAX_TRANSIENT_RETRIES {
                        return Err(Error::transport(
                            url,
                            format!("http status {status} after {attempt} retries"),
                        ));
                    }
                    let delay = BACKOFF_BASE * 2u32.pow(attempt);
                    warn!(url, %status, attempt, ?delay, "transient http status, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Ok(response) => {
                    return Err(Error::transport(
                        url,
                        format!("http status {}", response.status()),
                    ));
                }
                Err(e) => {
                    return Err(Error::transport(url, format!("request failed: {e}")));
                }
            }
        }
    }

    /// Streams the response body to `tmp_path`, enforcing the byte ceiling
    /// per chunk and the declared-size integrity check at the end.
    async fn stream_to_file(
        &self,
        url: &str,
        response: Response,
        tmp_path: &Path,
        declared_len: Option<u64>,
    ) -> Result<u64> {
        let mut file = tokio::fs::File::create(tmp_path)
            .await
            .map_err(|e| Error::transport(url, format!("failed to create temp file: {e}")))?;

        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| Error::transport(url, format!("body read failed: {e}")))?;
            bytes_written += chunk.len() as u64;
            if bytes_written > MAX_DOWNLOAD_BYTES {
                return Err(Error::transport(
                    url,
                    format!("download exceeded the {} byte ceiling", MAX_DOWNLOAD_BYTES),
                ));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::transport(url, format!("write failed: {e}")))?;
        }

        file.flush()
            .await
            .map_err(|e| Error::transport(url, format!("flush failed: {e}")))?;
        drop(file);

        // A server that declared a size must deliver exactly that many bytes.
        if let Some(expected) = declared_len {
            if bytes_written != expected {
                return Err(Error::transport(
                    url,
                    format!(
                        "integrity mismatch: declared {} bytes, received {}",
                        expected, bytes_written
                    ),
                ));
            }
        }

        Ok(bytes_written)
    }
}

/// Parses the declared `Content-Length` header, ignoring zero, absent, and
/// malformed values.
fn declared_length(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|len| *len > 0)
}

/// Returns the `<destination>.tmp` sibling path used during streaming.
fn tmp_sibling(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    destination.with_file_name(format!("{file_name}.tmp"))
}

/// Whether a status code is worth retrying at the transport layer.
fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// Audio or generic binary content types are acceptable for asset downloads.
fn is_acceptable_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("audio/")
        || essence == "application/octet-stream"
        || essence == "binary/octet-stream"
}

// =============================================================================
// Tests
// =============================================================================
