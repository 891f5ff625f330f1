//! Hand-assembled `nom` tokenizer: the source text becomes a flat
//! `Vec<Spanned<Token>>`, which the Pratt parser then consumes.
//!
//! Grounded in the teacher's `fhirpath-parser::tokenizer`'s token set, with
//! the zero-copy `&'input str` slices kept for identifiers and the raw text
//! of numeric/date/time literals (parsed on demand by the parser, not here).

use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, tag, take_while, take_while1};
use nom::character::complete::{char, digit1, multispace1};
use nom::combinator::{opt, recognize, value};
use nom::multi::many0;
use nom::sequence::{pair, preceded};
use nom::{IResult, Parser};

use crate::error::ParseError;
use crate::span::{offset, Span, Spanned};

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    Integer(i64),
    /// Raw decimal text (`"1.10"`), parsed to `Decimal` at literal-construction time.
    Decimal(&'input str),
    /// Already escape-processed string contents (no surrounding quotes).
    String(String),
    Boolean(bool),
    /// Raw text after `@`, before the parser decides Date vs DateTime vs Time.
    DateTimeLiteral(&'input str),
    Identifier(&'input str),
    /// A `` `delimited` `` identifier; contents already unescaped.
    DelimitedIdentifier(String),

    Plus,
    Minus,
    Star,
    Slash,
    Div,
    Mod,
    Ampersand,
    Pipe,
    Eq,
    NotEq,
    Equivalent,
    NotEquivalent,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Xor,
    Implies,
    Not,
    In,
    Contains,
    Is,
    As,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,

    Percent,

    DollarThis,
    DollarIndex,
    DollarTotal,
}

fn ws0(input: Span) -> IResult<Span, ()> {
    value((), many0(multispace1)).parse(input)
}

fn lex_integer_or_decimal(input: Span) -> IResult<Span, Token> {
    let (rest, int_part) = digit1(input)?;
    match opt(pair(char('.'), digit1)).parse(rest)? {
        (rest2, Some(_)) => {
            let consumed = rest2.location_offset() - input.location_offset();
            let full = &input.fragment()[..consumed];
            Ok((rest2, Token::Decimal(full)))
        }
        (rest2, None) => {
            let n: i64 = int_part.fragment().parse().map_err(|_| {
                nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
            })?;
            Ok((rest2, Token::Integer(n)))
        }
    }
}

fn lex_string(input: Span) -> IResult<Span, Token> {
    let (rest, contents) = preceded(
        char('\''),
        nom::combinator::cut(pair(
            opt(escaped_transform(
                is_not("'\\"),
                '\\',
                alt((
                    value('\'', char('\'')),
                    value('\\', char('\\')),
                    value('\n', char('n')),
                    value('\r', char('r')),
                    value('\t', char('t')),
                    value('/', char('/')),
                    value('`', char('`')),
                )),
            )),
            char('\''),
        )),
    )
    .parse(input)?;
    Ok((rest, Token::String(contents.0.unwrap_or_default())))
}

fn lex_delimited_identifier(input: Span) -> IResult<Span, Token> {
    let (rest, contents) = preceded(
        char('`'),
        nom::combinator::cut(pair(opt(is_not("`")), char('`'))),
    )
    .parse(input)?;
    let text = contents.0.map(|s: Span| s.fragment().to_string()).unwrap_or_default();
    Ok((rest, Token::DelimitedIdentifier(text)))
}

fn lex_date_time_literal(input: Span) -> IResult<Span, Token> {
    let (rest, _) = char('@')(input)?;
    let (rest, text) = take_while1(|c: char| {
        c.is_ascii_digit() || matches!(c, '-' | ':' | '.' | 'T' | '+' | 'Z')
    })
    .parse(rest)?;
    Ok((rest, Token::DateTimeLiteral(text.fragment())))
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn lex_identifier_or_keyword(input: Span) -> IResult<Span, Token> {
    let (rest, text) = recognize(pair(
        nom::character::complete::satisfy(is_ident_start),
        take_while(is_ident_continue),
    ))
    .parse(input)?;
    let word = *text.fragment();
    let token = match word {
        "true" => Token::Boolean(true),
        "false" => Token::Boolean(false),
        "and" => Token::And,
        "or" => Token::Or,
        "xor" => Token::Xor,
        "implies" => Token::Implies,
        "not" => Token::Not,
        "in" => Token::In,
        "contains" => Token::Contains,
        "is" => Token::Is,
        "as" => Token::As,
        "div" => Token::Div,
        "mod" => Token::Mod,
        _ => Token::Identifier(word),
    };
    Ok((rest, token))
}

fn lex_special_variable(input: Span) -> IResult<Span, Token> {
    let (rest, _) = char('$')(input)?;
    alt((
        value(Token::DollarThis, tag("this")),
        value(Token::DollarIndex, tag("index")),
        value(Token::DollarTotal, tag("total")),
    ))
    .parse(rest)
}

fn lex_symbol(input: Span) -> IResult<Span, Token> {
    alt((
        value(Token::Lte, tag("<=")),
        value(Token::Gte, tag(">=")),
        value(Token::NotEquivalent, tag("!~")),
        value(Token::NotEq, tag("!=")),
        value(Token::Equivalent, tag("~")),
        value(Token::Lt, char('<')),
        value(Token::Gt, char('>')),
        value(Token::Eq, char('=')),
        value(Token::Plus, char('+')),
        value(Token::Minus, char('-')),
        value(Token::Star, char('*')),
        value(Token::Slash, char('/')),
        value(Token::Ampersand, char('&')),
        value(Token::Pipe, char('|')),
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
        value(Token::LBracket, char('[')),
        value(Token::RBracket, char(']')),
        value(Token::LBrace, char('{')),
        value(Token::RBrace, char('}')),
        value(Token::Dot, char('.')),
        value(Token::Comma, char(',')),
        value(Token::Percent, char('%')),
    ))
    .parse(input)
}

fn lex_one(input: Span) -> IResult<Span, Token> {
    alt((
        lex_date_time_literal,
        lex_special_variable,
        lex_string,
        lex_delimited_identifier,
        lex_integer_or_decimal,
        lex_identifier_or_keyword,
        lex_symbol,
    ))
    .parse(input)
}

/// Tokenize `source` into a flat stream with byte-offset spans.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token<'_>>>, ParseError> {
    let mut input = Span::new(source);
    let mut tokens = Vec::new();

    loop {
        let (rest, _) = ws0(input).expect("ws0 never fails");
        input = rest;
        if input.fragment().is_empty() {
            break;
        }
        let start = offset(&input);
        match lex_one(input) {
            Ok((rest, token)) => {
                let end = offset(&rest);
                tokens.push(Spanned::new(token, start, end));
                input = rest;
            }
            Err(_) => {
                let bad = input.fragment().chars().next().unwrap_or(' ');
                return Err(ParseError::syntax(
                    start,
                    format!("unexpected character '{bad}'"),
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.value)
            .collect()
    }

    #[test]
    fn tokenizes_simple_path_navigation() {
        assert_eq!(
            kinds("Patient.name.family"),
            vec![
                Token::Identifier("Patient"),
                Token::Dot,
                Token::Identifier("name"),
                Token::Dot,
                Token::Identifier("family"),
            ]
        );
    }

    #[test]
    fn distinguishes_integer_and_decimal() {
        assert_eq!(kinds("42"), vec![Token::Integer(42)]);
        assert_eq!(kinds("1.50"), vec![Token::Decimal("1.50")]);
    }

    #[test]
    fn string_literal_unescapes_quote_and_backslash() {
        assert_eq!(
            kinds(r"'it\'s a \\test'"),
            vec![Token::String("it's a \\test".to_string())]
        );
    }

    #[test]
    fn keywords_and_special_variables_are_recognized() {
        assert_eq!(
            kinds("$this.where(a and b)"),
            vec![
                Token::DollarThis,
                Token::Dot,
                Token::Identifier("where"),
                Token::LParen,
                Token::Identifier("a"),
                Token::And,
                Token::Identifier("b"),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn ampersand_and_membership_operators_tokenize() {
        assert_eq!(
            kinds("a & b in c"),
            vec![
                Token::Identifier("a"),
                Token::Ampersand,
                Token::Identifier("b"),
                Token::In,
                Token::Identifier("c"),
            ]
        );
    }

    #[test]
    fn unknown_character_is_a_syntax_error() {
        assert!(tokenize("a # b").is_err());
    }
}
