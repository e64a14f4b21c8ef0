//! Streaming chat-completion client.
//!
//! [`chat::StreamingAnswerDecoder`] turns the cumulative text of a `data:`
//! event stream into answer updates and an end-of-stream signal;
//! [`chat::http::HttpTransport`] feeds it from a blocking reqwest request.

pub mod chat;
pub mod cli_args;
pub mod config;
pub mod logging;
pub mod render;
pub mod setup;
