use super::{spaces, string, RedKind, Redirect};
use crate::Error;

use anyhow::Context;
use combine::many;
use combine::{Parser, Stream};
use std::fmt;
use std::path::{Path, PathBuf};

/// One program invocation of a pipeline.
///
/// `args` always holds at least the program name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    args: Vec<String>,
    stdin: Option<PathBuf>,
    stdout: Option<PathBuf>,
}

impl Stage {
    /// Tokenize and resolve one stage of a line.
    pub fn parse(text: &str, max_tokens: usize) -> anyhow::Result<Self> {
        let mut args = tokenize(text, max_tokens)?;
        let redirect = Redirect::resolve(&mut args)?;
        let mut stage = Self::new(args)?;
        if let Some(Redirect { kind, target }) = redirect {
            match kind {
                RedKind::Stdin => stage.stdin = Some(target),
                RedKind::OverwriteStdout => stage.stdout = Some(target),
            }
        }
        Ok(stage)
    }

    pub fn new<T, TS>(args: TS) -> anyhow::Result<Self>
    where
        T: Into<String>,
        TS: IntoIterator<Item = T>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.into()).collect();
        if args.is_empty() {
            return Err(Error::EmptyStage.into());
        }
        Ok(Self {
            args,
            stdin: None,
            stdout: None,
        })
    }

    pub fn stdin_from<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn stdout_to<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.stdout = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.args[0]
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn stdin(&self) -> Option<&Path> {
        self.stdin.as_deref()
    }

    pub fn stdout(&self) -> Option<&Path> {
        self.stdout.as_deref()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))?;
        if let Some(path) = &self.stdin {
            write!(f, " < {}", path.display())?;
        }
        if let Some(path) = &self.stdout {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

/// Split a stage's text on blanks, keeping at most `max_tokens` words.
pub fn tokenize(text: &str, max_tokens: usize) -> anyhow::Result<Vec<String>> {
    let (mut words, _) = words()
        .parse(text)
        .context("Failed to tokenize the command.")?;
    if words.len() > max_tokens {
        tracing::debug!(
            count = words.len(),
            max_tokens,
            "dropping tokens past the limit"
        );
        words.truncate(max_tokens);
    }
    Ok(words)
}

fn words<I: Stream<Token = char>>() -> impl Parser<I, Output = Vec<String>> {
    spaces().with(many(string().skip(spaces())))
}
