use crate::Error;
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedKind,
    pub target: PathBuf,
}

impl Redirect {
    /// Split the first `<` or `>` directive off `args`.
    ///
    /// Only one directive per stage is honored: `args` is truncated at the
    /// operator and everything after the file name is dropped.
    pub fn resolve(args: &mut Vec<String>) -> anyhow::Result<Option<Self>> {
        let found = args
            .iter()
            .enumerate()
            .find_map(|(i, arg)| RedKind::from_token(arg).map(|kind| (i, kind)));

        let (pos, kind) = match found {
            Some(found) => found,
            None => return Ok(None),
        };

        let target = match args.get(pos + 1) {
            Some(file) => PathBuf::from(file),
            None => return Err(Error::MissingRedirectTarget(kind.to_string()).into()),
        };
        args.truncate(pos);

        Ok(Some(Self { kind, target }))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedKind {
    /// `< file`: read-only stdin.
    Stdin,
    /// `> file`: stdout created or truncated.
    OverwriteStdout,
}

impl RedKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(Self::Stdin),
            ">" => Some(Self::OverwriteStdout),
            _ => None,
        }
    }
}

impl fmt::Display for RedKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "<"),
            Self::OverwriteStdout => write!(f, ">"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn output_redirect_truncates_args() {
        let mut a = args("echo hi > out.txt");
        let red = Redirect::resolve(&mut a).unwrap().unwrap();
        assert_eq!(red.kind, RedKind::OverwriteStdout);
        assert_eq!(red.target, PathBuf::from("out.txt"));
        assert_eq!(a, args("echo hi"));
    }

    #[test]
    fn first_operator_wins() {
        let mut a = args("sort < in.txt > out.txt");
        let red = Redirect::resolve(&mut a).unwrap().unwrap();
        assert_eq!(red.kind, RedKind::Stdin);
        assert_eq!(red.target, PathBuf::from("in.txt"));
        assert_eq!(a, args("sort"));
    }

    #[test]
    fn args_after_target_are_dropped() {
        let mut a = args("grep > hits.txt foo");
        Redirect::resolve(&mut a).unwrap();
        assert_eq!(a, args("grep"));
    }

    #[test]
    fn glued_operator_is_a_plain_argument() {
        let mut a = args("echo >out.txt");
        assert!(Redirect::resolve(&mut a).unwrap().is_none());
        assert_eq!(a, args("echo >out.txt"));
    }

    #[test]
    fn missing_target_is_rejected() {
        let mut a = args("echo hi >");
        let err = Redirect::resolve(&mut a).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingRedirectTarget(op)) if op == ">"
        ));
    }
}
