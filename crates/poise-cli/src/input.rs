//! Line input for the menu shell
//!
//! The shell only ever asks for one line at a time, so the seam is a single
//! method. A terminal gets line editing and history through rustyline; piped
//! stdin and tests go through any `BufRead`.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Write};

/// Source of user input lines
pub trait LineSource {
    /// Show `prompt` and read one line without its terminator.
    ///
    /// `Ok(None)` means the input is exhausted (closed stdin, Ctrl-D).
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Reads lines from any buffered reader, echoing prompts to `echo`.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
pub struct ReaderSource<R, W> {
    reader: R,
    echo: W,
}

impl<R: BufRead, W: Write> ReaderSource<R, W> {
    pub fn new(reader: R, echo: W) -> Self {
        Self { reader, echo }
    }
}

impl<R: BufRead, W: Write> LineSource for ReaderSource<R, W> {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.echo, "{}", prompt)?;
        self.echo.flush()?;

        let mut raw = Vec::new();
        if self.reader.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&raw);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Interactive terminal input with line editing
pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }
}
