use std::path::{Path, PathBuf};

use crate::parse::Limits;

/// Interpreter settings: prompt, history, startup file and parser caps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    pub history_file: Option<PathBuf>,
    pub history_size: usize,
    pub rc_file: Option<PathBuf>,
    pub max_stages: usize,
    pub max_tokens: usize,
}

impl Default for Config {
    fn default() -> Self {
        let home = home_dir();
        Self {
            prompt: String::from("pish> "),
            history_file: home.as_ref().map(|h| h.join(".pish_history")),
            history_size: 1000,
            rc_file: home.as_ref().map(|h| h.join(".pishrc")),
            max_stages: 10,
            max_tokens: 63,
        }
    }
}

impl Config {
    /// Defaults with `PISH_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg
    }

    /// Apply overrides looked up by key. Unparsable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PISH_PROMPT") {
            self.prompt = v;
        }
        if let Some(v) = lookup("PISH_HISTFILE") {
            self.history_file = non_empty_path(&v);
        }
        if let Some(n) = lookup("PISH_HISTSIZE").and_then(|v| v.parse().ok()) {
            self.history_size = n;
        }
        if let Some(v) = lookup("PISH_RC") {
            self.rc_file = non_empty_path(&v);
        }
        if let Some(n) = lookup("PISH_MAX_STAGES").and_then(|v| v.parse().ok()) {
            self.max_stages = n;
        }
        if let Some(n) = lookup("PISH_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.max_tokens = n;
        }
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_stages: self.max_stages,
            max_tokens: self.max_tokens,
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

// An empty value disables the file.
fn non_empty_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(expand_tilde(value))
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => Path::new(path).to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_parser_caps() {
        let cfg = Config::default();
        assert_eq!(cfg.prompt, "pish> ");
        assert_eq!(cfg.history_size, 1000);
        assert_eq!(
            cfg.limits(),
            Limits {
                max_stages: 10,
                max_tokens: 63
            }
        );
    }

    #[test]
    fn overrides_replace_values() {
        let mut cfg = Config::default();
        cfg.apply_overrides(lookup(&[
            ("PISH_PROMPT", "$ "),
            ("PISH_MAX_STAGES", "3"),
            ("PISH_HISTFILE", "/tmp/pish-hist"),
            ("PISH_RC", ""),
        ]));
        assert_eq!(cfg.prompt, "$ ");
        assert_eq!(cfg.max_stages, 3);
        assert_eq!(cfg.history_file, Some(PathBuf::from("/tmp/pish-hist")));
        assert_eq!(cfg.rc_file, None);
    }

    #[test]
    fn bad_numbers_are_ignored() {
        let mut cfg = Config::default();
        cfg.apply_overrides(lookup(&[("PISH_MAX_TOKENS", "many"), ("PISH_HISTSIZE", "-1")]));
        assert_eq!(cfg.max_tokens, 63);
        assert_eq!(cfg.history_size, 1000);
    }
}
