//! Line sources the interpreter pulls commands and follow-up answers from.
use std::{
    collections::VecDeque,
    io::{BufRead, Write},
};

use crate::error::CommandError;

pub trait LineInput {
    /// Reads the next line, `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, CommandError>;

    /// Shows a line of output to whoever is driving this input.
    fn message(&mut self, text: &str);

    /// The source confirmation questions should be asked on.
    ///
    /// Script feeds delegate to the terminal that started them.
    fn interactive(&mut self) -> &mut dyn LineInput;

    /// Records a successfully read command line, e.g. in the editor history.
    fn remember(&mut self, _line: &str) {}
}

/// Pre-recorded input. Messages and prompts are captured in a transcript.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineInput for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, CommandError> {
        if !prompt.is_empty() {
            self.transcript.push(prompt.to_string());
        }
        Ok(self.lines.pop_front())
    }

    fn message(&mut self, text: &str) {
        self.transcript.push(text.to_string());
    }

    fn interactive(&mut self) -> &mut dyn LineInput {
        self
    }
}

/// Plain reader/writer pair, used when stdin is not a terminal.
pub struct StreamInput<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> StreamInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> LineInput for StreamInput<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, CommandError> {
        write!(self.writer, "{}", prompt)
            .and_then(|_| self.writer.flush())
            .map_err(|e| CommandError::Input(e.to_string()))?;

        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
            Err(e) => Err(CommandError::Input(e.to_string())),
        }
    }

    fn message(&mut self, text: &str) {
        if let Err(e) = writeln!(self.writer, "{}", text) {
            tracing::warn!("failed to write output: {}", e);
        }
    }

    fn interactive(&mut self) -> &mut dyn LineInput {
        self
    }
}
