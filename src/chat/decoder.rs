use anyhow::Result;
use log::{debug, error, warn};
use serde_json::Value;

use super::stream::{AnswerUpdate, DecodedEvent, decode_delta};
use super::{RequestDescriptor, Transport, TransportResponse};
use crate::config::DEFAULT_COMPLETION_URL;

type AnswerCallback<'a> = Box<dyn FnMut(&AnswerUpdate) + 'a>;
type CompleteCallback<'a> = Box<dyn FnMut() + 'a>;

/// What a single progress notification produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    /// `data:` records whose JSON parsed.
    pub parsed: usize,
    /// `data:` records that failed to parse and were skipped.
    pub failed: usize,
    /// Answer records delivered to the answer callback.
    pub answers: usize,
    /// End-of-stream records seen.
    pub completions: usize,
}

/// One chat session's view of a streaming completion.
///
/// The transport reports the whole body received so far; the decoder keeps
/// track of how much it has already seen, decodes only the new suffix and
/// drives the answer/complete callbacks synchronously, in stream order.
pub struct StreamingAnswerDecoder<'a> {
    endpoint: String,
    buffered_text: String,
    current_answer: String,
    on_answer: Option<AnswerCallback<'a>>,
    on_complete: Option<CompleteCallback<'a>>,
}

impl Default for StreamingAnswerDecoder<'_> {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETION_URL)
    }
}

impl<'a> StreamingAnswerDecoder<'a> {
    pub fn new(endpoint: impl Into<String>) -> Self {
        StreamingAnswerDecoder {
            endpoint: endpoint.into(),
            buffered_text: String::new(),
            current_answer: String::new(),
            on_answer: None,
            on_complete: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Latest full answer seen on this session.
    pub fn current_answer(&self) -> &str {
        &self.current_answer
    }

    pub fn buffered_len(&self) -> usize {
        self.buffered_text.len()
    }

    /// Replace the answer callback. Last set wins.
    pub fn set_answer_callback(&mut self, callback: impl FnMut(&AnswerUpdate) + 'a) {
        self.on_answer = Some(Box::new(callback));
    }

    pub fn clear_answer_callback(&mut self) {
        self.on_answer = None;
    }

    /// Replace the completion callback. Last set wins.
    pub fn set_complete_callback(&mut self, callback: impl FnMut() + 'a) {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn clear_complete_callback(&mut self) {
        self.on_complete = None;
    }

    /// Issue the completion request and decode its body as it streams in.
    ///
    /// Transport failures are logged and returned as-is; the session is left
    /// untouched so the caller decides when to `cleanup()`.
    pub fn start_session(
        &mut self,
        transport: &dyn Transport,
        payload: Value,
    ) -> Result<TransportResponse> {
        self.buffered_text.clear();
        self.current_answer.clear();

        let request = RequestDescriptor::event_stream(self.endpoint.clone(), payload);
        debug!("Starting chat stream against {}", request.url);

        let result = transport.execute(&request, &mut |text: &str| {
            self.on_progress(text);
        });

        if let Err(e) = &result {
            error!("Stream chat error: {e:#}");
        }

        result
    }

    /// Feed the cumulative response text received so far.
    pub fn on_progress(&mut self, full_text_so_far: &str) -> ProgressSummary {
        let delta = self.advance(full_text_so_far);
        let mut summary = ProgressSummary::default();

        for decoded in decode_delta(delta) {
            match decoded {
                Err(e) => {
                    summary.failed += 1;
                    error!("Parse response data error: {e}");
                }
                Ok(None) => {
                    summary.parsed += 1;
                    debug!("Ignoring data record without answer or end marker");
                }
                Ok(Some(DecodedEvent::StreamEnd)) => {
                    summary.parsed += 1;
                    summary.completions += 1;
                    if let Some(callback) = self.on_complete.as_mut() {
                        callback();
                    }
                }
                Ok(Some(DecodedEvent::AnswerDelta(update))) => {
                    summary.parsed += 1;
                    summary.answers += 1;
                    self.current_answer.clone_from(&update.answer);
                    if let Some(callback) = self.on_answer.as_mut() {
                        callback(&update);
                    }
                }
            }
        }

        summary
    }

    /// Drop buffered text, the current answer and both callbacks.
    pub fn cleanup(&mut self) {
        self.buffered_text.clear();
        self.current_answer.clear();
        self.on_answer = None;
        self.on_complete = None;
    }

    /// Record `full` as seen and return the part not seen before.
    fn advance<'t>(&mut self, full: &'t str) -> &'t str {
        let seen = self.buffered_text.len();

        let delta = if full.len() >= seen && full.is_char_boundary(seen) {
            &full[seen..]
        } else {
            warn!(
                "Response text ({} bytes) does not extend the {} buffered bytes; resynchronizing",
                full.len(),
                seen
            );
            full
        };

        self.buffered_text.clear();
        self.buffered_text.push_str(full);
        delta
    }
}
