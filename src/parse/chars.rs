use combine::{many1, satisfy, skip_many};
use combine::{Parser, Stream};

/// Argument separators: space, tab, carriage return and newline.
pub fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

pub fn spaces<I: Stream<Token = char>>() -> impl Parser<I, Output = ()> {
    skip_many(satisfy(is_blank))
}

pub fn string<I: Stream<Token = char>>() -> impl Parser<I, Output = String> {
    many1(satisfy(|c: char| !is_blank(c)))
}
