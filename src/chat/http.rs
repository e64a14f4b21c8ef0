use super::{RequestDescriptor, ResponseType, Transport, TransportResponse};
use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use std::io::{ErrorKind, Read};
use std::str;
use std::time::Duration;

const READ_CHUNK: usize = 8 * 1024;

/// Blocking reqwest transport that reports the body as it grows.
pub struct HttpTransport {
    client: Client,
    api_key: Option<String>,
}

impl HttpTransport {
    /// `timeout` of `None` lets a stream run as long as the server keeps it open.
    pub fn new(timeout: Option<Duration>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(HttpTransport { client, api_key })
    }
}

impl Transport for HttpTransport {
    fn execute(
        &self,
        request: &RequestDescriptor,
        progress: &mut dyn FnMut(&str),
    ) -> Result<TransportResponse> {
        log::info!("POST {} (streaming)", request.url);

        let body = serde_json::to_string(&request.payload)
            .context("failed to encode chat request payload")?;
        log::trace!("Chat request body: {body}");

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .body(body);

        for (name, value) in &request.headers {
            builder = builder.header(*name, *value);
        }
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .with_context(|| format!("failed to send chat request to {}", request.url))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(anyhow!(
                "chat API error: HTTP {} - {}",
                status.as_u16(),
                text
            ));
        }

        let body = match request.response_type {
            ResponseType::Text => read_progressively(resp, progress)?,
        };

        log::debug!("Chat stream closed after {} bytes", body.len());

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Read `reader` to the end, calling `progress` with the cumulative text each
/// time it grows.
///
/// A multi-byte character split across reads is held back until its last
/// byte arrives, so every reported text extends the previous one.
pub fn read_progressively<R: Read>(
    mut reader: R,
    progress: &mut dyn FnMut(&str),
) -> Result<String> {
    let mut text = String::new();
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("failed to read chat stream"),
        };

        pending.extend_from_slice(&chunk[..n]);
        let before = text.len();
        drain_utf8(&mut pending, &mut text);

        if text.len() > before {
            progress(&text);
        }
    }

    if !pending.is_empty() {
        // Stream ended inside a character.
        text.push(char::REPLACEMENT_CHARACTER);
        progress(&text);
    }

    Ok(text)
}

/// Move every complete character from `pending` into `text`.
fn drain_utf8(pending: &mut Vec<u8>, text: &mut String) {
    loop {
        match str::from_utf8(pending) {
            Ok(s) => {
                text.push_str(s);
                pending.clear();
                return;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                if let Ok(s) = str::from_utf8(&pending[..valid]) {
                    text.push_str(s);
                }
                match e.error_len() {
                    Some(bad) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + bad);
                    }
                    None => {
                        pending.drain(..valid);
                        return;
                    }
                }
            }
        }
    }
}
