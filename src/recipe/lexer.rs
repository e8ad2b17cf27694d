// Token-level parsers shared by the recipe grammar

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{map, map_res, opt, recognize},
    multi::many0_count,
    sequence::{delimited, pair},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Identifier: letter or underscore, then letters, digits, underscores
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Double-quoted string without escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(opt(is_not("\"")), |s: Option<&str>| s.unwrap_or_default().to_string()),
        char('"'),
    )(input)
}

pub fn integer(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>)(input)
}
