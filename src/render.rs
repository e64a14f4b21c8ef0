use std::io::{self, Write};

use crate::chat::AnswerUpdate;

/// Writes a streamed answer to `out`, printing only what has grown since the
/// last update.
///
/// The server resends the full answer each time, so a new answer that does not
/// extend the printed one is written again on a fresh line.
pub struct AnswerPrinter<W: Write> {
    out: W,
    printed: String,
    last_reference: Vec<serde_json::Value>,
}

impl<W: Write> AnswerPrinter<W> {
    pub fn new(out: W) -> Self {
        AnswerPrinter {
            out,
            printed: String::new(),
            last_reference: Vec::new(),
        }
    }

    pub fn update(&mut self, update: &AnswerUpdate) -> io::Result<()> {
        match update.answer.strip_prefix(self.printed.as_str()) {
            Some(grown) => self.out.write_all(grown.as_bytes())?,
            None => {
                writeln!(self.out)?;
                self.out.write_all(update.answer.as_bytes())?;
            }
        }
        self.out.flush()?;

        self.printed.clone_from(&update.answer);
        self.last_reference.clone_from(&update.reference);
        Ok(())
    }

    pub fn finish(&mut self, show_references: bool) -> io::Result<()> {
        writeln!(self.out)?;
        if show_references && !self.last_reference.is_empty() {
            writeln!(self.out, "----- References ({}) -----", self.last_reference.len())?;
            for (idx, reference) in self.last_reference.iter().enumerate() {
                writeln!(self.out, "[{}] {}", idx + 1, reference)?;
            }
        }
        self.out.flush()
    }

    pub fn answer(&self) -> &str {
        &self.printed
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
