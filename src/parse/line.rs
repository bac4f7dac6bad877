use super::{Limits, Stage};

use anyhow::Context;
use combine::{many, satisfy, sep_by, token};
use combine::{Parser, Stream};
use std::fmt;

/// An ordered chain of stages; stage order is pipe order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    pub bg: bool,
}

impl Pipeline {
    pub fn parse(input: &str, limits: Limits) -> anyhow::Result<Self> {
        let (body, bg) = split_background(input);

        if body.trim().is_empty() {
            return Ok(Self {
                stages: Vec::new(),
                bg,
            });
        }

        let (mut texts, _) = segments()
            .parse(body)
            .context("Failed to split the pipeline.")?;
        if texts.len() > limits.max_stages {
            tracing::debug!(
                count = texts.len(),
                max_stages = limits.max_stages,
                "dropping stages past the limit"
            );
            texts.truncate(limits.max_stages);
        }

        let stages = texts
            .iter()
            .map(|text| Stage::parse(text.trim_start(), limits.max_tokens))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self { stages, bg })
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}

/// Strip a trailing `&`, reporting whether one was there.
fn split_background(input: &str) -> (&str, bool) {
    let trimmed = input.trim_end();
    match trimmed.strip_suffix('&') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    }
}

fn segments<I: Stream<Token = char>>() -> impl Parser<I, Output = Vec<String>> {
    sep_by(many::<String, _, _>(satisfy(|c: char| c != '|')), token('|'))
}
