mod chars;
mod command;
mod line;
mod redirect;

pub use command::{tokenize, Stage};
pub use line::Pipeline;
pub use redirect::{RedKind, Redirect};

use chars::{spaces, string};

/// Caps applied while parsing. Input past them is dropped, not rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_stages: usize,
    pub max_tokens: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_stages: 10,
            max_tokens: 63,
        }
    }
}

pub fn parse_line(input: &str, limits: Limits) -> anyhow::Result<Pipeline> {
    Pipeline::parse(input, limits)
}
