//! Precedence-climbing (Pratt) parser turning a token stream into an
//! `fhirpath_ast::ExpressionNode` tree.
//!
//! The precedence ladder is the teacher's `parser::pratt::Precedence` table
//! verbatim (`Implies` loosest, `Invocation` tightest); FHIRPath's `is`/`as`
//! sit between `Union` and `Additive`, exactly as the teacher's enum orders
//! them.

use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::str::FromStr;

use fhirpath_ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};

use crate::error::ParseError;
use crate::span::Spanned;
use crate::tokenizer::{tokenize, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Implies = 1,
    Or = 2,
    And = 3,
    Membership = 4,
    Equality = 5,
    Relational = 6,
    Union = 7,
    Type = 8,
    Additive = 9,
    Multiplicative = 10,
}

impl Precedence {
    fn next(self) -> u8 {
        self as u8 + 1
    }

    fn is_right_associative(self) -> bool {
        matches!(self, Precedence::Implies)
    }
}

enum TypeOp {
    Is,
    As,
}

/// What an operator token resolves to: an ordinary binary operator, or the
/// `is`/`as` type operators (which take a type name, not a full expression,
/// on their right).
enum OpKind {
    Binary(BinaryOperator),
    Type(TypeOp),
}

fn precedence_of(token: &Token) -> Option<(Precedence, OpKind)> {
    use BinaryOperator as B;
    use Precedence as P;
    Some(match token {
        Token::Implies => (P::Implies, OpKind::Binary(B::Implies)),
        Token::Or => (P::Or, OpKind::Binary(B::Or)),
        Token::Xor => (P::Or, OpKind::Binary(B::Xor)),
        Token::And => (P::And, OpKind::Binary(B::And)),
        Token::In => (P::Membership, OpKind::Binary(B::In)),
        Token::Contains => (P::Membership, OpKind::Binary(B::Contains)),
        Token::Eq => (P::Equality, OpKind::Binary(B::Equal)),
        Token::NotEq => (P::Equality, OpKind::Binary(B::NotEqual)),
        Token::Equivalent => (P::Equality, OpKind::Binary(B::Equivalent)),
        Token::NotEquivalent => (P::Equality, OpKind::Binary(B::NotEquivalent)),
        Token::Lt => (P::Relational, OpKind::Binary(B::LessThan)),
        Token::Lte => (P::Relational, OpKind::Binary(B::LessThanOrEqual)),
        Token::Gt => (P::Relational, OpKind::Binary(B::GreaterThan)),
        Token::Gte => (P::Relational, OpKind::Binary(B::GreaterThanOrEqual)),
        Token::Pipe => (P::Union, OpKind::Binary(B::Union)),
        Token::Is => (P::Type, OpKind::Type(TypeOp::Is)),
        Token::As => (P::Type, OpKind::Type(TypeOp::As)),
        Token::Plus => (P::Additive, OpKind::Binary(B::Add)),
        Token::Minus => (P::Additive, OpKind::Binary(B::Subtract)),
        Token::Ampersand => (P::Additive, OpKind::Binary(B::Concatenate)),
        Token::Star => (P::Multiplicative, OpKind::Binary(B::Multiply)),
        Token::Slash => (P::Multiplicative, OpKind::Binary(B::Divide)),
        Token::Div => (P::Multiplicative, OpKind::Binary(B::IntegerDivide)),
        Token::Mod => (P::Multiplicative, OpKind::Binary(B::Modulo)),
        _ => return None,
    })
}

struct Parser<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
}

impl<'input> Parser<'input> {
    fn new(tokens: Vec<Spanned<Token<'input>>>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token<'input>> {
        self.tokens.get(self.pos).map(|s| &s.value)
    }

    fn peek_pos(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.start)
            .unwrap_or_else(|| self.tokens.last().map(|s| s.end).unwrap_or(0))
    }

    fn advance(&mut self) -> Option<Token<'input>> {
        let token = self.tokens.get(self.pos).map(|s| s.value.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Some(Token::Identifier(name)) => Ok(name.to_string()),
            Some(Token::DelimitedIdentifier(name)) => Ok(name),
            // keywords are valid member/type names in FHIRPath's grammar
            Some(Token::And) => Ok("and".to_string()),
            Some(Token::Or) => Ok("or".to_string()),
            Some(Token::Xor) => Ok("xor".to_string()),
            Some(Token::Div) => Ok("div".to_string()),
            Some(Token::Mod) => Ok("mod".to_string()),
            Some(Token::In) => Ok("in".to_string()),
            Some(Token::Contains) => Ok("contains".to_string()),
            Some(Token::Is) => Ok("is".to_string()),
            Some(Token::As) => Ok("as".to_string()),
            other => Err(ParseError::expected(
                self.peek_pos(),
                format!("identifier, found {other:?}"),
            )),
        }
    }

    /// A (possibly dotted) type name, e.g. `String` or `FHIR.boolean`.
    fn parse_type_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_identifier()?;
        while matches!(self.peek(), Some(Token::Dot)) {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    /// `ofType(TypeSpecifier)`'s single argument names a type rather than an
    /// expression to evaluate, same as `is`/`as`; wrapped as a string
    /// literal so `OfTypeFn` sees it as a pre-evaluated value like any other
    /// argument, rather than needing its own dedicated AST node.
    fn parse_type_specifier_arg(&mut self) -> Result<SmallVec<[ExpressionNode; 4]>, ParseError> {
        self.expect(Token::LParen)?;
        let type_name = self.parse_type_name()?;
        self.expect(Token::RParen)?;
        let mut args = SmallVec::new();
        args.push(ExpressionNode::literal(LiteralValue::String(type_name)));
        Ok(args)
    }

    fn parse_expression(&mut self, min_prec: u8) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let Some((prec, kind)) = self.peek().and_then(precedence_of) else {
                break;
            };
            if (prec as u8) < min_prec {
                break;
            }
            self.advance();

            match kind {
                OpKind::Type(type_op) => {
                    let type_name = self.parse_type_name()?;
                    left = match type_op {
                        TypeOp::Is => ExpressionNode::type_check(left, type_name),
                        TypeOp::As => ExpressionNode::type_cast(left, type_name),
                    };
                }
                OpKind::Binary(op) => {
                    let next_min = if prec.is_right_associative() {
                        prec as u8
                    } else {
                        prec.next()
                    };
                    let right = self.parse_expression(next_min)?;
                    left = ExpressionNode::binary_op(op, left, right);
                }
            }
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExpressionNode, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(ExpressionNode::unary_op(UnaryOperator::Minus, self.parse_unary()?))
            }
            Some(Token::Plus) => {
                self.advance();
                Ok(ExpressionNode::unary_op(UnaryOperator::Plus, self.parse_unary()?))
            }
            Some(Token::Not) => {
                self.advance();
                Ok(ExpressionNode::unary_op(UnaryOperator::Not, self.parse_unary()?))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut node = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    if name == "ofType" && matches!(self.peek(), Some(Token::LParen)) {
                        node = ExpressionNode::method_call(node, name, self.parse_type_specifier_arg()?);
                    } else if matches!(self.peek(), Some(Token::LParen)) {
                        let args = self.parse_arg_list()?;
                        node = ExpressionNode::method_call(node, name, args);
                    } else {
                        node = ExpressionNode::path(node, name);
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expression(1)?;
                    self.expect(Token::RBracket)?;
                    node = ExpressionNode::index(node, index);
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        match self.advance() {
            Some(t) if std::mem::discriminant(&t) == std::mem::discriminant(&expected) => Ok(()),
            other => Err(ParseError::expected(
                self.peek_pos(),
                format!("{expected:?}, found {other:?}"),
            )),
        }
    }

    fn parse_arg_list(&mut self) -> Result<SmallVec<[ExpressionNode; 4]>, ParseError> {
        self.expect(Token::LParen)?;
        let mut args = SmallVec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            args.push(self.parse_expression(1)?);
            while matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
                args.push(self.parse_expression(1)?);
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<ExpressionNode, ParseError> {
        let pos = self.peek_pos();
        match self.advance() {
            Some(Token::Integer(n)) => {
                if let Some(unit) = self.parse_trailing_unit()? {
                    return Ok(ExpressionNode::literal(LiteralValue::Quantity {
                        value: n.to_string(),
                        unit,
                    }));
                }
                Ok(ExpressionNode::literal(LiteralValue::Integer(n)))
            }
            Some(Token::Decimal(text)) => {
                Decimal::from_str(text)
                    .map_err(|_| ParseError::invalid_literal(pos, "decimal", text))?;
                if let Some(unit) = self.parse_trailing_unit()? {
                    return Ok(ExpressionNode::literal(LiteralValue::Quantity {
                        value: text.to_string(),
                        unit,
                    }));
                }
                Ok(ExpressionNode::literal(LiteralValue::Decimal(text.to_string())))
            }
            Some(Token::String(s)) => Ok(ExpressionNode::literal(LiteralValue::String(s))),
            Some(Token::Boolean(b)) => Ok(ExpressionNode::literal(LiteralValue::Boolean(b))),
            Some(Token::DateTimeLiteral(text)) => Ok(ExpressionNode::literal(classify_temporal(text))),
            Some(Token::DollarThis) => Ok(ExpressionNode::variable("this")),
            Some(Token::DollarIndex) => Ok(ExpressionNode::variable("index")),
            Some(Token::DollarTotal) => Ok(ExpressionNode::variable("total")),
            Some(Token::Percent) => {
                let name = match self.advance() {
                    Some(Token::Identifier(name)) => name.to_string(),
                    Some(Token::DelimitedIdentifier(name)) => name,
                    Some(Token::String(s)) => s,
                    other => {
                        return Err(ParseError::expected(
                            pos,
                            format!("environment variable name, found {other:?}"),
                        ))
                    }
                };
                Ok(ExpressionNode::variable(name))
            }
            Some(Token::LBrace) => {
                self.expect(Token::RBrace)?;
                Ok(ExpressionNode::literal(LiteralValue::Null))
            }
            Some(Token::LParen) => {
                let inner = self.parse_expression(1)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Identifier(name)) => self.parse_identifier_or_call(name.to_string()),
            Some(Token::DelimitedIdentifier(name)) => self.parse_identifier_or_call(name),
            other => Err(ParseError::expected(
                pos,
                format!("an expression, found {other:?}"),
            )),
        }
    }

    fn parse_identifier_or_call(&mut self, name: String) -> Result<ExpressionNode, ParseError> {
        if matches!(self.peek(), Some(Token::LParen)) {
            let args = self.parse_arg_list()?;
            Ok(ExpressionNode::function_call(name, args))
        } else {
            Ok(ExpressionNode::identifier(name))
        }
    }

    /// Quantity literals pair a number with a unit: either a quoted UCUM
    /// string immediately following, or a bare calendar-duration keyword
    /// (`year`, `years`, `day`, ...).
    fn parse_trailing_unit(&mut self) -> Result<Option<String>, ParseError> {
        match self.peek() {
            Some(Token::String(_)) => match self.advance() {
                Some(Token::String(unit)) => Ok(Some(unit)),
                _ => unreachable!(),
            },
            Some(Token::Identifier(word)) if CALENDAR_UNITS.contains(word) => {
                let word = word.to_string();
                self.advance();
                Ok(Some(word))
            }
            _ => Ok(None),
        }
    }

    fn finish(&self) -> Result<(), ParseError> {
        if self.pos < self.tokens.len() {
            Err(ParseError::syntax(
                self.peek_pos(),
                format!("unexpected trailing token {:?}", self.tokens[self.pos].value),
            ))
        } else {
            Ok(())
        }
    }
}

const CALENDAR_UNITS: &[&str] = &[
    "year", "years", "month", "months", "week", "weeks", "day", "days", "hour", "hours",
    "minute", "minutes", "second", "seconds", "millisecond", "milliseconds",
];

fn classify_temporal(text: &str) -> LiteralValue {
    if let Some(time) = text.strip_prefix('T') {
        LiteralValue::Time(time.to_string())
    } else if text.contains('T') {
        LiteralValue::DateTime(text.to_string())
    } else {
        LiteralValue::Date(text.to_string())
    }
}

/// Parse a full FHIRPath expression, requiring the entire input to be
/// consumed.
pub fn parse(source: &str) -> Result<ExpressionNode, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    if parser.tokens.is_empty() {
        return Err(ParseError::UnexpectedEof);
    }
    let node = parser.parse_expression(1)?;
    parser.finish()?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_navigation_left_to_right() {
        let expr = parse("Patient.name.family").unwrap();
        match expr {
            ExpressionNode::Path { path, .. } => assert_eq!(path, "family"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn additive_binds_looser_than_multiplicative() {
        // 1 + 2 * 3 must parse as 1 + (2 * 3)
        let expr = parse("1 + 2 * 3").unwrap();
        match expr {
            ExpressionNode::BinaryOp(data) => {
                assert_eq!(data.op, BinaryOperator::Add);
                assert!(matches!(data.right, ExpressionNode::BinaryOp(ref inner) if inner.op == BinaryOperator::Multiply));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn implies_is_right_associative() {
        // a implies b implies c must parse as a implies (b implies c)
        let expr = parse("a implies b implies c").unwrap();
        match expr {
            ExpressionNode::BinaryOp(data) => {
                assert_eq!(data.op, BinaryOperator::Implies);
                assert!(matches!(data.right, ExpressionNode::BinaryOp(ref inner) if inner.op == BinaryOperator::Implies));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn is_as_sit_between_additive_and_union() {
        let expr = parse("1 + 2 is Integer").unwrap();
        match expr {
            ExpressionNode::TypeCheck { expression, type_name } => {
                assert_eq!(type_name, "Integer");
                assert!(matches!(*expression, ExpressionNode::BinaryOp(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn of_type_argument_becomes_a_string_literal_not_navigation() {
        let expr = parse("children().ofType(FHIR.Patient)").unwrap();
        match expr {
            ExpressionNode::MethodCall(data) => {
                assert_eq!(data.name, "ofType");
                assert_eq!(data.args.len(), 1);
                assert!(matches!(
                    &data.args[0],
                    ExpressionNode::Literal(LiteralValue::String(s)) if s == "FHIR.Patient"
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn method_call_chain_builds_nested_method_calls() {
        let expr = parse("name.where(use = 'official').exists()").unwrap();
        match expr {
            ExpressionNode::MethodCall(outer) => {
                assert_eq!(outer.name, "exists");
                assert!(matches!(outer.base, ExpressionNode::MethodCall(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bare_function_call_and_indexer() {
        let expr = parse("name[0]").unwrap();
        assert!(matches!(expr, ExpressionNode::Index { .. }));

        let expr = parse("today()").unwrap();
        match expr {
            ExpressionNode::FunctionCall(data) => assert_eq!(data.name, "today"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn quantity_literal_pairs_number_and_calendar_unit() {
        let expr = parse("4 'years'").unwrap();
        match expr {
            ExpressionNode::Literal(LiteralValue::Quantity { unit, .. }) => {
                assert_eq!(unit, "years")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn quantity_literal_pairs_number_and_quoted_ucum_unit() {
        let expr = parse("17.4 'ms'").unwrap();
        match expr {
            ExpressionNode::Literal(LiteralValue::Quantity { value, unit }) => {
                assert_eq!(value, "17.4");
                assert_eq!(unit, "ms");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn trailing_non_digit_after_number_literal_is_a_parse_error() {
        // number_literal_test.go's TestNumberLiteralInvalidDecimal: "8237.1u"
        // doesn't pair a bare `u` as a calendar unit, so it's leftover input.
        assert!(parse("8237.1u").is_err());
        assert!(parse("8237u").is_err());
    }
}
