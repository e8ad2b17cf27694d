// Recipe grammar: kind(value by key[, series]) | modifier | ...

use super::ast::{Modifier, RawRecipe};
use super::lexer::{identifier, integer, string_literal, ws};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{eof, map, opt},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};

fn parenthesized<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(ws(char('(')), inner, ws(char(')')))
}

/// `sum(revenue)` or a bare `revenue`
fn parse_value(input: &str) -> IResult<&str, (Option<String>, String)> {
    alt((
        map(pair(ws(identifier), parenthesized(ws(identifier))), |(r, m)| (Some(r), m)),
        map(ws(identifier), |m| (None, m)),
    ))(input)
}

fn parse_modifier(input: &str) -> IResult<&str, Modifier> {
    alt((
        map(preceded(ws(tag("top")), parenthesized(ws(integer))), Modifier::Top),
        map(preceded(ws(tag("order")), parenthesized(ws(identifier))), Modifier::Order),
        map(preceded(ws(tag("title")), parenthesized(ws(string_literal))), Modifier::Title),
    ))(input)
}

/// Parse a complete recipe; trailing input is an error
pub fn parse_raw_recipe(input: &str) -> IResult<&str, RawRecipe> {
    let (input, kind) = ws(identifier)(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, (reduction, measure)) = parse_value(input)?;
    let (input, _) = ws(tag("by"))(input)?;
    let (input, key) = ws(identifier)(input)?;
    let (input, series) = opt(preceded(ws(char(',')), ws(identifier)))(input)?;
    let (input, _) = ws(char(')'))(input)?;
    let (input, modifiers) = many0(preceded(ws(char('|')), parse_modifier))(input)?;
    let (input, _) = ws(eof)(input)?;

    Ok((
        input,
        RawRecipe {
            kind,
            reduction,
            measure,
            key,
            series,
            modifiers,
        },
    ))
}
