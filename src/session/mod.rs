mod io;
mod prompt;

pub use io::IOReader;
pub use prompt::PromptReader;

use crate::eval::{Flow, Shell};

use std::io::Write;

/// A source of command lines.
pub trait Reader {
    /// `None` at end of input.
    fn next_line(&mut self) -> anyhow::Result<Option<String>>;
}

/// Feeds lines from a reader into a shell until input ends or `exit` runs.
pub struct Session<R> {
    reader: R,
}

impl<R: Reader> Session<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Run one line. `None` at end of input.
    ///
    /// Errors from the line itself are reported on stderr and do not stop the
    /// session; only a failing reader is returned.
    pub fn next(&mut self, shell: &mut Shell) -> anyhow::Result<Option<Flow>> {
        let line = match self.reader.next_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        let line = line.trim();
        if line.is_empty() {
            return Ok(Some(Flow::Continue));
        }

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let flow = match shell.eval(line, &mut out) {
            Ok(flow) => flow,
            Err(e) => {
                tracing::debug!(line, "line failed: {:?}", e);
                eprintln!("pish: {:#}", e);
                Flow::Continue
            }
        };
        out.flush()?;

        Ok(Some(flow))
    }

    /// Run every line. Returns the code passed to `exit`, or `None` when input
    /// simply ran out.
    pub fn all(&mut self, shell: &mut Shell) -> anyhow::Result<Option<i32>> {
        while let Some(flow) = self.next(shell)? {
            if let Flow::Exit(code) = flow {
                return Ok(Some(code));
            }
        }

        Ok(None)
    }
}
