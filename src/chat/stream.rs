use serde::Serialize;
use serde_json::Value;

const DATA_PREFIX: &str = "data:";

/// Payload delivered to the answer callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerUpdate {
    pub answer: String,
    pub reference: Vec<Value>,
}

/// One decoded `data:` record.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    AnswerDelta(AnswerUpdate),
    StreamEnd,
}

/// Split a delta into `data:` records and decode each one.
///
/// Every surviving line yields one entry, in order. Lines that parse as JSON
/// but carry neither an end sentinel nor an answer yield `Ok(None)`.
pub fn decode_delta(delta: &str) -> Vec<Result<Option<DecodedEvent>, serde_json::Error>> {
    delta
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.starts_with(DATA_PREFIX))
        .map(|line| parse_data_line(&line[DATA_PREFIX.len()..]))
        .collect()
}

fn parse_data_line(raw: &str) -> Result<Option<DecodedEvent>, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(classify(&value))
}

fn classify(value: &Value) -> Option<DecodedEvent> {
    let data = value.get("data")?;

    if data == &Value::Bool(true) {
        return Some(DecodedEvent::StreamEnd);
    }

    // Presence of the key is what counts, not its type.
    let answer = match data.as_object()?.get("answer")? {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };

    Some(DecodedEvent::AnswerDelta(AnswerUpdate {
        answer,
        reference: references(data.get("reference")),
    }))
}

/// Arrays pass through as-is; falsy values mean "no references".
fn references(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Vec::new(),
        Some(other) => vec![other.clone()],
    }
}
