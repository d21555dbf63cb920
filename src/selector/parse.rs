//! Selector text parser.
//!
//! Parses the selector query language into the [`Selector`] structure.
//!
//! ## Grammar
//!
//! ```text
//! <list>       := <chain> ("," <chain>)*
//! <chain>      := <compound> (<combinator> <compound>)*
//! <combinator> := ">" | "+" | "~" | whitespace
//! <compound>   := <test>+
//! <test>       := tag | "*" | "." path | "[" path (op literal)? "]" | ":" pseudo
//! <pseudo>     := "not" "(" <list> ")" | "matches" "(" <list> ")"
//!               | "first-child" | "last-child" | "nth-child" "(" integer ")"
//!               | category-name
//! ```
//!
//! Chains associate left, so matching reads them right-to-left. A failed
//! parse reports the byte offset of the failure and a description of what
//! was expected there.

use thiserror::Error;
use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, repeat, separated};
use winnow::error::{ContextError, ErrMode, ParserError, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};
use winnow::ModalResult;

use crate::selector::ast::{AttrOp, AttrValue, Combinator, Selector, Test};

/// Error type for selector compilation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector text is malformed.
    #[error("syntax error in selector \"{selector}\" at position {offset}: expected {expected}")]
    Syntax {
        selector: String,
        offset: usize,
        expected: String,
    },

    /// A category pseudo-class is not present in the supplied table.
    #[error("unknown category ':{name}' in selector \"{selector}\"")]
    UnknownCategory { selector: String, name: String },
}

impl SelectorError {
    /// Re-attach the full registered text (the parser only sees the body
    /// with any phase marker stripped).
    pub(crate) fn with_selector(self, text: &str) -> Self {
        match self {
            SelectorError::Syntax {
                offset, expected, ..
            } => SelectorError::Syntax {
                selector: text.to_string(),
                offset,
                expected,
            },
            SelectorError::UnknownCategory { name, .. } => SelectorError::UnknownCategory {
                selector: text.to_string(),
                name,
            },
        }
    }
}

/// Parse selector text into a [`Selector`].
pub(crate) fn parse_selector(text: &str) -> Result<Selector, SelectorError> {
    if text.trim().is_empty() {
        return Err(SelectorError::Syntax {
            selector: text.to_string(),
            offset: 0,
            expected: "a selector".to_string(),
        });
    }

    selector_list.parse(text).map_err(|err| {
        let offset = err.offset();
        let inner = err.into_inner();
        SelectorError::Syntax {
            selector: text.to_string(),
            offset,
            expected: describe_expected(&inner),
        }
    })
}

fn describe_expected(err: &ContextError) -> String {
    let expected: Vec<String> = err
        .context()
        .filter_map(|context| match context {
            StrContext::Expected(value) => Some(value.to_string()),
            _ => None,
        })
        .collect();
    if expected.is_empty() {
        "a selector".to_string()
    } else {
        expected.join(" or ")
    }
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

/// Parse a comma-separated selector list (lowest precedence).
fn selector_list(input: &mut &str) -> ModalResult<Selector> {
    let first = chain.parse_next(input)?;

    let rest: Vec<Selector> = repeat(
        0..,
        preceded(
            (multispace0, ',', multispace0),
            cut_err(chain.context(StrContext::Expected(StrContextValue::Description(
                "selector",
            )))),
        ),
    )
    .parse_next(input)?;

    if rest.is_empty() {
        Ok(first)
    } else {
        let mut all = vec![first];
        all.extend(rest);
        Ok(Selector::List(all))
    }
}

/// Parse a combinator chain, associating left.
fn chain(input: &mut &str) -> ModalResult<Selector> {
    let _ = multispace0.parse_next(input)?;
    let mut current = compound.parse_next(input)?;

    loop {
        let checkpoint = *input;
        let ws: &str = multispace0.parse_next(input)?;

        let explicit = opt(alt((
            '>'.value(Combinator::Child),
            '+'.value(Combinator::AdjacentSibling),
            '~'.value(Combinator::GeneralSibling),
        )))
        .parse_next(input)?;

        if let Some(combinator) = explicit {
            let _ = multispace0.parse_next(input)?;
            let right = cut_err(compound.context(StrContext::Expected(
                StrContextValue::Description("selector"),
            )))
            .parse_next(input)?;
            current = Selector::Relation {
                combinator,
                left: Box::new(current),
                right: Box::new(right),
            };
            continue;
        }

        if !ws.is_empty() && input.starts_with(is_compound_start) {
            let right = compound.parse_next(input)?;
            current = Selector::Relation {
                combinator: Combinator::Descendant,
                left: Box::new(current),
                right: Box::new(right),
            };
            continue;
        }

        *input = checkpoint;
        return Ok(current);
    }
}

fn is_compound_start(c: char) -> bool {
    c == '*' || c == '[' || c == ':' || c == '.' || c.is_ascii_alphanumeric() || c == '_'
}

/// Parse a compound: one or more simple tests with no separating space.
fn compound(input: &mut &str) -> ModalResult<Selector> {
    let tests: Vec<Test> = repeat(1.., simple_test).parse_next(input)?;
    Ok(Selector::Compound(tests))
}

fn simple_test(input: &mut &str) -> ModalResult<Test> {
    alt((
        '*'.value(Test::Wildcard),
        attribute_test,
        field_test,
        pseudo_class,
        ident.map(Test::Tag),
    ))
    .parse_next(input)
}

/// Parse `[path]` or `[path OP literal]`.
fn attribute_test(input: &mut &str) -> ModalResult<Test> {
    let _ = '['.parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    let path = cut_err(dotted_path.context(StrContext::Expected(StrContextValue::Description(
        "attribute path",
    ))))
    .parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    let predicate = opt((
        attr_op,
        multispace0,
        cut_err(attr_value.context(StrContext::Expected(StrContextValue::Description(
            "literal value",
        )))),
    ))
    .parse_next(input)?
    .map(|(op, _, value)| (op, value));
    let _ = multispace0.parse_next(input)?;
    let _ = cut_err(']'.context(StrContext::Expected(StrContextValue::CharLiteral(']'))))
        .parse_next(input)?;
    Ok(Test::Attr { path, predicate })
}

/// Parse `.path`, the field test.
fn field_test(input: &mut &str) -> ModalResult<Test> {
    let _ = '.'.parse_next(input)?;
    let path = cut_err(dotted_path.context(StrContext::Expected(StrContextValue::Description(
        "field name",
    ))))
    .parse_next(input)?;
    Ok(Test::Field(path))
}

/// Parse `:name`, `:name(selectors)`, or `:nth-child(N)`.
fn pseudo_class(input: &mut &str) -> ModalResult<Test> {
    let _ = ':'.parse_next(input)?;
    let name = cut_err(ident.context(StrContext::Expected(StrContextValue::Description(
        "pseudo-class name",
    ))))
    .parse_next(input)?;

    match name.as_str() {
        "not" => {
            let alternatives = cut_err(selector_args.context(StrContext::Expected(
                StrContextValue::Description("'(' with selectors"),
            )))
            .parse_next(input)?;
            Ok(Test::Not(alternatives))
        }
        "matches" => {
            let alternatives = cut_err(selector_args.context(StrContext::Expected(
                StrContextValue::Description("'(' with selectors"),
            )))
            .parse_next(input)?;
            Ok(Test::Matches(alternatives))
        }
        "first-child" => Ok(Test::FirstChild),
        "last-child" => Ok(Test::LastChild),
        "nth-child" => {
            let position = cut_err(
                delimited(('(', multispace0), integer, (multispace0, ')')).context(
                    StrContext::Expected(StrContextValue::Description("'(' with a child index")),
                ),
            )
            .parse_next(input)?;
            Ok(Test::NthChild(position))
        }
        // The phase marker is stripped before parsing; an interior one is
        // malformed.
        "exit" => Err(ErrMode::from_input(input).cut()),
        _ => Ok(Test::Category(name)),
    }
}

/// Parse a parenthesized comma-separated selector list.
fn selector_args(input: &mut &str) -> ModalResult<Vec<Selector>> {
    delimited(
        ('(', multispace0),
        separated(1.., chain, (multispace0, ',', multispace0)),
        (
            multispace0,
            cut_err(')'.context(StrContext::Expected(StrContextValue::CharLiteral(')')))),
        ),
    )
    .parse_next(input)
}

fn dotted_path(input: &mut &str) -> ModalResult<Vec<String>> {
    separated(1.., ident, '.').parse_next(input)
}

fn ident(input: &mut &str) -> ModalResult<String> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    })
    .map(|s: &str| s.to_string())
    .parse_next(input)
}

fn integer(input: &mut &str) -> ModalResult<usize> {
    let digits: &str = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    digits
        .parse::<usize>()
        .map_err(|_| ErrMode::from_input(input))
}

fn attr_op(input: &mut &str) -> ModalResult<AttrOp> {
    alt((
        ">=".map(|_| AttrOp::Ge),
        "<=".map(|_| AttrOp::Le),
        "!=".map(|_| AttrOp::Ne),
        ">".map(|_| AttrOp::Gt),
        "<".map(|_| AttrOp::Lt),
        "=".map(|_| AttrOp::Eq),
    ))
    .parse_next(input)
}

fn attr_value(input: &mut &str) -> ModalResult<AttrValue> {
    alt((
        double_quoted.map(AttrValue::Str),
        single_quoted.map(AttrValue::Str),
        number_value,
        bare_value,
    ))
    .parse_next(input)
}

/// Parse a double-quoted string.
fn double_quoted(input: &mut &str) -> ModalResult<String> {
    delimited('"', take_till(0.., |c| c == '"'), '"')
        .map(|s: &str| s.to_string())
        .parse_next(input)
}

/// Parse a single-quoted string.
fn single_quoted(input: &mut &str) -> ModalResult<String> {
    delimited('\'', take_till(0.., |c| c == '\''), '\'')
        .map(|s: &str| s.to_string())
        .parse_next(input)
}

fn number_value(input: &mut &str) -> ModalResult<AttrValue> {
    let sign = opt('-').parse_next(input)?;
    let int_part: &str = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let fraction: Option<(char, &str)> =
        opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))).parse_next(input)?;

    let mut text = String::new();
    if sign.is_some() {
        text.push('-');
    }
    text.push_str(int_part);
    if let Some((_, digits)) = fraction {
        text.push('.');
        text.push_str(digits);
    }
    let value = text
        .parse::<f64>()
        .map_err(|_| ErrMode::from_input(input))?;
    Ok(AttrValue::Num(value))
}

/// Parse an unquoted value: `true`/`false`/`null` or a bare word.
fn bare_value(input: &mut &str) -> ModalResult<AttrValue> {
    let word = ident.parse_next(input)?;
    Ok(match word.as_str() {
        "true" => AttrValue::Bool(true),
        "false" => AttrValue::Bool(false),
        "null" => AttrValue::Null,
        _ => AttrValue::Str(word),
    })
}
