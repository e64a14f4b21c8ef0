use anyhow::{Context, Result};
use log::debug;
use serde_json::{json, Value};

use crate::chat::StreamingAnswerDecoder;
use crate::chat::http::HttpTransport;
use crate::cli_args::Cli;
use crate::config::Config;

/// Build the HTTP transport based on config.
pub fn build_transport(cfg: &Config) -> Result<HttpTransport> {
    debug!(
        "Using HttpTransport with timeout {:?}, api key {}",
        cfg.timeout(),
        if cfg.api_key.is_some() { "set" } else { "unset" }
    );

    HttpTransport::new(cfg.timeout(), cfg.api_key.clone())
}

/// A fresh session aimed at the configured completion endpoint.
pub fn build_decoder<'a>(cfg: &Config) -> StreamingAnswerDecoder<'a> {
    StreamingAnswerDecoder::new(cfg.completion_url())
}

/// Request body from `--payload`, or built from the question.
pub fn build_payload(cli: &Cli) -> Result<Value> {
    if let Some(raw) = &cli.payload {
        return serde_json::from_str(raw).context("--payload is not valid JSON");
    }

    let question = cli.question.as_deref().unwrap_or_default();
    let mut payload = json!({
        "messages": [{ "role": "user", "content": question }],
        "stream": true,
    });
    if let Some(id) = &cli.conversation_id {
        payload["conversation_id"] = Value::String(id.clone());
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn payload_from_question_and_conversation() {
        let cli = Cli::parse_from(["chatstream", "--conversation-id", "c42", "what is rust?"]);
        let payload = build_payload(&cli).unwrap();
        assert_eq!(
            payload,
            json!({
                "conversation_id": "c42",
                "messages": [{ "role": "user", "content": "what is rust?" }],
                "stream": true,
            })
        );
    }

    #[test]
    fn raw_payload_is_passed_through() {
        let cli = Cli::parse_from(["chatstream", "--payload", r#"{"quote":false}"#]);
        assert_eq!(build_payload(&cli).unwrap(), json!({"quote": false}));
    }

    #[test]
    fn invalid_raw_payload_is_an_error() {
        let cli = Cli::parse_from(["chatstream", "--payload", "{nope"]);
        assert!(build_payload(&cli).is_err());
    }

    #[test]
    fn decoder_targets_configured_url() {
        let cfg = Config {
            base_url: "http://chat.internal:8080".into(),
            ..Config::default()
        };
        let decoder = build_decoder(&cfg);
        assert_eq!(
            decoder.endpoint(),
            "http://chat.internal:8080/v1/conversation/completion"
        );
    }
}
