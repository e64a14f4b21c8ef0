pub mod decoder;
pub mod http;
pub mod stream;

use anyhow::Result;
use serde_json::Value;

pub use decoder::{ProgressSummary, StreamingAnswerDecoder};
pub use stream::{AnswerUpdate, DecodedEvent, decode_delta};

/// How the transport should hand the body back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Text,
}

/// Everything a transport needs to issue one completion request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: reqwest::Method,
    pub url: String,
    pub payload: Value,
    pub headers: Vec<(&'static str, &'static str)>,
    pub response_type: ResponseType,
}

impl RequestDescriptor {
    /// POST `payload` as JSON and ask for an event stream back.
    pub fn event_stream(url: impl Into<String>, payload: Value) -> Self {
        RequestDescriptor {
            method: reqwest::Method::POST,
            url: url.into(),
            payload,
            headers: vec![
                ("Content-Type", "application/json"),
                ("Accept", "text/event-stream"),
            ],
            response_type: ResponseType::Text,
        }
    }
}

/// Final outcome of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Something that can run a request and report the body as it grows.
pub trait Transport {
    /// Execute `request`, calling `progress` with the cumulative response text
    /// every time more of it arrives.
    fn execute(
        &self,
        request: &RequestDescriptor,
        progress: &mut dyn FnMut(&str),
    ) -> Result<TransportResponse>;
}
