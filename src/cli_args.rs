use clap::{ArgAction, Parser};

/// CLI options
#[derive(Parser, Debug)]
#[command(
    name = "chatstream",
    version,
    about = "Ask a chat-completion endpoint a question and stream the answer"
)]
pub struct Cli {
    /// Question to send as the user message
    #[arg(required_unless_present = "payload")]
    pub question: Option<String>,

    /// Conversation the question belongs to
    #[arg(long)]
    pub conversation_id: Option<String>,

    /// Raw JSON request body; replaces the payload built from the question
    #[arg(long, conflicts_with = "question")]
    pub payload: Option<String>,

    /// Server base URL (e.g. http://127.0.0.1:9380)
    #[arg(long)]
    pub base_url: Option<String>,

    /// API key sent as a bearer token
    #[arg(long, env = "CHATSTREAM_API_KEY")]
    pub api_key: Option<String>,

    /// Request timeout in seconds; 0 waits forever
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print the references attached to the final answer
    #[arg(long)]
    pub show_references: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
