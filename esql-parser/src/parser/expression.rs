use crate::{
    ast::{AstNode, Column, Function, FunctionKind, List, Literal, LiteralValue, Param},
    lexer::Token,
    spans::{Location, M},
};

use super::{ParseInput, ParserError};

/// Words that end an expression and can never start one.
const RESERVED: &[&str] = &[
    "and", "as", "asc", "by", "desc", "in", "is", "like", "metadata", "nulls", "on", "or",
    "rlike", "with",
];

/// Words that always read as literals or operators in expressions.
const NOT_NAMES: &[&str] = &["false", "not", "null", "true"];

const NOT_PRECEDENCE: u8 = 5;
const UNARY_PRECEDENCE: u8 = 13;

#[derive(Debug, PartialEq, Clone, Copy)]
enum InfixOp {
    Or,
    And,
    Compare(&'static str),
    Arithmetic(&'static str),
    Like { regex: bool, negated: bool },
    In { negated: bool },
    IsNull { negated: bool },
    Cast,
}

impl InfixOp {
    fn binding_power(self) -> (u8, u8) {
        match self {
            InfixOp::Or => (1, 2),
            InfixOp::And => (3, 4),
            InfixOp::Compare(_)
            | InfixOp::Like { .. }
            | InfixOp::In { .. }
            | InfixOp::IsNull { .. } => (7, 8),
            InfixOp::Arithmetic("+") | InfixOp::Arithmetic("-") => (9, 10),
            InfixOp::Arithmetic(_) => (11, 12),
            InfixOp::Cast => (15, 16),
        }
    }
}

pub fn parse_expression(input: &mut ParseInput) -> Result<AstNode, ParserError> {
    pratt_parse(input, 0)
}

/// Pratt parsing of expressions based on
/// https://matklad.github.io/2020/04/13/simple-but-powerful-pratt-parsing.html
fn pratt_parse(input: &mut ParseInput, min_bp: u8) -> Result<AstNode, ParserError> {
    input.enter()?;
    let result = pratt_parse_nested(input, min_bp);
    input.leave();
    result
}

fn pratt_parse_nested(input: &mut ParseInput, min_bp: u8) -> Result<AstNode, ParserError> {
    let mut lhs = parse_prefix(input)?;
    loop {
        let checkpoint = input.checkpoint();
        let op = match try_parse_infix_op(input)? {
            Some(op) => op,
            None => break,
        };
        let (l_bp, r_bp) = op.value.binding_power();

        if l_bp < min_bp {
            input.restore(checkpoint);
            break;
        }

        lhs = match op.value {
            InfixOp::Or => binary("or", lhs, pratt_parse(input, r_bp)?),
            InfixOp::And => binary("and", lhs, pratt_parse(input, r_bp)?),
            InfixOp::Compare(name) | InfixOp::Arithmetic(name) => {
                binary(name, lhs, pratt_parse(input, r_bp)?)
            }
            InfixOp::Like { regex, negated } => {
                let name = match (regex, negated) {
                    (false, false) => "like",
                    (false, true) => "not like",
                    (true, false) => "rlike",
                    (true, true) => "not rlike",
                };
                binary(name, lhs, pratt_parse(input, r_bp)?)
            }
            InfixOp::In { negated } => {
                let list = parse_in_list(input)?;
                binary(if negated { "not in" } else { "in" }, lhs, list)
            }
            InfixOp::IsNull { negated } => {
                let location = lhs.location().join(op.location);
                AstNode::Function(Function {
                    name: String::from(if negated { "is not null" } else { "is null" }),
                    subtype: FunctionKind::PostfixUnaryExpression,
                    args: vec![lhs],
                    location,
                })
            }
            InfixOp::Cast => {
                let data_type = super::parse_term(input)?;
                let location = lhs.location().join(data_type.location);
                AstNode::Function(Function {
                    name: String::from("::"),
                    subtype: FunctionKind::InlineCast,
                    args: vec![
                        lhs,
                        AstNode::Literal(Literal {
                            value: LiteralValue::String(data_type.value.to_lowercase()),
                            location: data_type.location,
                        }),
                    ],
                    location,
                })
            }
        };
    }
    Ok(lhs)
}

fn binary(name: &str, left: AstNode, right: AstNode) -> AstNode {
    let location = left.location().join(right.location());
    AstNode::Function(Function {
        name: String::from(name),
        subtype: FunctionKind::BinaryExpression,
        args: vec![left, right],
        location,
    })
}

fn unary(name: &str, op: Location, operand: AstNode) -> AstNode {
    let location = op.join(operand.location());
    AstNode::Function(Function {
        name: String::from(name),
        subtype: FunctionKind::UnaryExpression,
        args: vec![operand],
        location,
    })
}

fn parse_prefix(input: &mut ParseInput) -> Result<AstNode, ParserError> {
    if let Some(not) = input.next_if_word("not") {
        let operand = pratt_parse(input, NOT_PRECEDENCE)?;
        return Ok(unary("not", not, operand));
    }

    let sign = match input.peek_token() {
        Some(Token::Sub) => Some("-"),
        Some(Token::Add) => Some("+"),
        _ => None,
    };
    if let Some(sign) = sign {
        let op = input.next()?.location;
        let operand = pratt_parse(input, UNARY_PRECEDENCE)?;
        return Ok(fold_sign(sign, op, operand));
    }

    parse_primary(input)
}

/// `-1` becomes a negative literal rather than a unary minus over `1`.
fn fold_sign(sign: &str, op: Location, operand: AstNode) -> AstNode {
    match operand {
        AstNode::Literal(Literal {
            value: LiteralValue::Integer(value),
            location,
        }) => AstNode::Literal(Literal {
            value: LiteralValue::Integer(if sign == "-" { -value } else { value }),
            location: op.join(location),
        }),
        AstNode::Literal(Literal {
            value: LiteralValue::Decimal(value),
            location,
        }) => AstNode::Literal(Literal {
            value: LiteralValue::Decimal(if sign == "-" { -value } else { value }),
            location: op.join(location),
        }),
        operand => unary(sign, op, operand),
    }
}

/// Consumes the next binary or postfix operator, if any.
fn try_parse_infix_op(input: &mut ParseInput) -> Result<Option<M<InfixOp>>, ParserError> {
    let (token, location) = match input.peek() {
        Some(next) => (next.token.clone(), next.location),
        None => return Ok(None),
    };
    let op = match &token {
        Token::EQ => InfixOp::Compare("=="),
        Token::NEQ => InfixOp::Compare("!="),
        Token::LT => InfixOp::Compare("<"),
        Token::LTE => InfixOp::Compare("<="),
        Token::GT => InfixOp::Compare(">"),
        Token::GTE => InfixOp::Compare(">="),
        Token::CIEQ => InfixOp::Compare("=~"),

        Token::Add => InfixOp::Arithmetic("+"),
        Token::Sub => InfixOp::Arithmetic("-"),
        Token::Star => InfixOp::Arithmetic("*"),
        Token::Div => InfixOp::Arithmetic("/"),
        Token::Mod => InfixOp::Arithmetic("%"),

        Token::Cast => InfixOp::Cast,

        token if token.is_word("or") => InfixOp::Or,
        token if token.is_word("and") => InfixOp::And,
        token if token.is_word("like") => InfixOp::Like {
            regex: false,
            negated: false,
        },
        token if token.is_word("rlike") => InfixOp::Like {
            regex: true,
            negated: false,
        },
        token if token.is_word("in") => InfixOp::In { negated: false },
        token if token.is_word("is") => {
            let _ = input.next()?;
            let negated = input.next_if_word("not").is_some();
            let null = input.assert_word("null")?;
            return Ok(Some(M::new_range(InfixOp::IsNull { negated }, location, null)));
        }
        token if token.is_word("not") => {
            let negated_op = match input.peek_nth(1).map(|data| &data.token) {
                Some(token) if token.is_word("like") => InfixOp::Like {
                    regex: false,
                    negated: true,
                },
                Some(token) if token.is_word("rlike") => InfixOp::Like {
                    regex: true,
                    negated: true,
                },
                Some(token) if token.is_word("in") => InfixOp::In { negated: true },
                _ => return Ok(None),
            };
            let _ = input.next()?;
            let end = input.next()?.location;
            return Ok(Some(M::new_range(negated_op, location, end)));
        }
        _ => return Ok(None),
    };
    let _ = input.next()?;
    Ok(Some(M::new(op, location)))
}

fn parse_in_list(input: &mut ParseInput) -> Result<AstNode, ParserError> {
    let open = input.assert_next(Token::LParen, "'(' after IN")?;
    let mut values = vec![parse_expression(input)?];
    while input.next_if(Token::Comma).is_some() {
        values.push(parse_expression(input)?);
    }
    let close = close_paren(input, open)?;
    Ok(AstNode::List(List {
        values,
        location: open.join(close),
    }))
}

/// Expects `)` matching the `(` at `open`. Running out of input reports
/// the unmatched `(` rather than the end of the query.
fn close_paren(input: &mut ParseInput, open: Location) -> Result<Location, ParserError> {
    if let Some(close) = input.next_if(Token::RParen) {
        return Ok(close);
    }
    match input.peek_token() {
        None | Some(Token::Pipe) => {
            Err(input.error_at(open, "Unbalanced parenthesis: '(' is never closed"))
        }
        _ => Err(input.unexpected("',' or ')'")),
    }
}

fn parse_primary(input: &mut ParseInput) -> Result<AstNode, ParserError> {
    let next = match input.peek() {
        Some(next) => next.clone(),
        None => return Err(input.unexpected("an expression")),
    };

    let literal = |value| {
        Ok(AstNode::Literal(Literal {
            value,
            location: next.location,
        }))
    };

    match next.token {
        Token::LParen => {
            let open = input.next()?.location;
            let inner = parse_expression(input)?;
            close_paren(input, open)?;
            Ok(inner)
        }
        Token::LBracket => parse_list(input),
        Token::IntegerLiteral(value) => {
            input.next()?;
            literal(LiteralValue::Integer(value))
        }
        Token::DecimalLiteral(value) => {
            input.next()?;
            literal(LiteralValue::Decimal(value))
        }
        Token::StringLiteral(value) => {
            input.next()?;
            literal(LiteralValue::String(value))
        }
        Token::Param => {
            input.next()?;
            literal(LiteralValue::Param(Param::Unnamed))
        }
        Token::NamedParam(name) => {
            input.next()?;
            literal(LiteralValue::Param(Param::Named(name)))
        }
        Token::PositionalParam(index) => {
            input.next()?;
            literal(LiteralValue::Param(Param::Positional(index)))
        }
        Token::Term(ref word) if word.eq_ignore_ascii_case("true") => {
            input.next()?;
            literal(LiteralValue::Boolean(true))
        }
        Token::Term(ref word) if word.eq_ignore_ascii_case("false") => {
            input.next()?;
            literal(LiteralValue::Boolean(false))
        }
        Token::Term(ref word) if word.eq_ignore_ascii_case("null") => {
            input.next()?;
            literal(LiteralValue::Null)
        }
        Token::Term(ref word) if is_reserved(word) => Err(input.unexpected("an expression")),
        Token::Term(_) if input.peek_nth(1).map(|data| &data.token) == Some(&Token::LParen) => {
            parse_function_call(input)
        }
        Token::Term(_) | Token::QuotedTerm(_) => {
            parse_qualified_name(input).map(AstNode::Column)
        }
        _ => Err(input.unexpected("an expression")),
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|reserved| reserved.eq_ignore_ascii_case(word))
}

/// Whether `word` can be written as an unquoted column name part.
pub fn is_bare_name(word: &str) -> bool {
    !is_reserved(word) && !NOT_NAMES.iter().any(|name| name.eq_ignore_ascii_case(word))
}

fn parse_list(input: &mut ParseInput) -> Result<AstNode, ParserError> {
    let open = input.assert_next(Token::LBracket, "'['")?;
    let mut values = vec![parse_expression(input)?];
    while input.next_if(Token::Comma).is_some() {
        values.push(parse_expression(input)?);
    }
    if let Some(close) = input.next_if(Token::RBracket) {
        return Ok(AstNode::List(List {
            values,
            location: open.join(close),
        }));
    }
    match input.peek_token() {
        None | Some(Token::Pipe) => {
            Err(input.error_at(open, "Unbalanced bracket: '[' is never closed"))
        }
        _ => Err(input.unexpected("',' or ']'")),
    }
}

fn parse_function_call(input: &mut ParseInput) -> Result<AstNode, ParserError> {
    let name = super::parse_term(input)?;
    let open = input.assert_next(Token::LParen, "'('")?;

    let mut args = Vec::new();
    if input.peek_is(&Token::Star) && input.peek_nth(1).map(|data| &data.token) == Some(&Token::RParen) {
        let star = input.next()?.location;
        args.push(AstNode::Column(Column::new(vec![String::from("*")], false, star)));
    } else if !input.peek_is(&Token::RParen) {
        args.push(parse_expression(input)?);
        while input.next_if(Token::Comma).is_some() {
            args.push(parse_expression(input)?);
        }
    }
    let close = close_paren(input, open)?;

    Ok(AstNode::Function(Function {
        name: name.value.to_lowercase(),
        subtype: FunctionKind::VariadicCall,
        args,
        location: name.location.join(close),
    }))
}

/// `a`, `host.name`, `` `weird name`.b ``
pub fn parse_qualified_name(input: &mut ParseInput) -> Result<Column, ParserError> {
    let (first, mut quoted) = parse_name_part(input)?;
    let mut location = first.location;
    let mut parts = vec![first.value];

    while input.peek_is(&Token::Dot) {
        let checkpoint = input.checkpoint();
        input.next()?;
        match parse_name_part(input) {
            Ok((part, part_quoted)) => {
                location = location.join(part.location);
                quoted |= part_quoted;
                parts.push(part.value);
            }
            Err(_) => {
                input.restore(checkpoint);
                break;
            }
        }
    }

    Ok(Column::new(parts, quoted, location))
}

fn parse_name_part(input: &mut ParseInput) -> Result<(M<String>, bool), ParserError> {
    let next = match input.peek() {
        Some(next) => next.clone(),
        None => return Err(input.unexpected("a column name")),
    };
    match next.token {
        Token::Term(word) if is_bare_name(&word) => {
            input.next()?;
            Ok((M::new(word, next.location), false))
        }
        Token::QuotedTerm(word) => {
            input.next()?;
            Ok((M::new(word, next.location), true))
        }
        _ => Err(input.unexpected("a column name")),
    }
}

/// Like [`parse_qualified_name`], but unquoted parts may contain `*`
/// wildcards glued to the surrounding text (`KEEP host.*, *_bytes`).
pub fn parse_qualified_name_pattern(input: &mut ParseInput) -> Result<Column, ParserError> {
    let (first, mut quoted) = parse_pattern_part(input)?;
    let mut location = first.location;
    let mut parts = vec![first.value];

    while input.peek_is(&Token::Dot) {
        let checkpoint = input.checkpoint();
        input.next()?;
        match parse_pattern_part(input) {
            Ok((part, part_quoted)) => {
                location = location.join(part.location);
                quoted |= part_quoted;
                parts.push(part.value);
            }
            Err(_) => {
                input.restore(checkpoint);
                break;
            }
        }
    }

    Ok(Column::new(parts, quoted, location))
}

fn parse_pattern_part(input: &mut ParseInput) -> Result<(M<String>, bool), ParserError> {
    if let Some(Token::QuotedTerm(_)) = input.peek_token() {
        return parse_name_part(input);
    }

    let mut text = String::new();
    let mut location: Option<Location> = None;
    while let Some(next) = input.peek() {
        if let Some(current) = location {
            if !current.precedes(next.location) {
                break;
            }
        }
        match &next.token {
            Token::Term(word) if location.is_some() || is_bare_name(word) => text.push_str(word),
            Token::Term(word) if !is_reserved(word) && glued_star_follows(input) => {
                text.push_str(word)
            }
            Token::Star => text.push('*'),
            Token::IntegerLiteral(_) if location.is_some() => {
                text.push_str(next.text(input.source()))
            }
            _ => break,
        }
        let part = next.location;
        location = Some(location.map_or(part, |current| current.join(part)));
        input.next()?;
    }

    match location {
        Some(location) => Ok((M::new(text, location), false)),
        None => Err(input.unexpected("a column name or pattern")),
    }
}

fn glued_star_follows(input: &ParseInput) -> bool {
    match (input.peek(), input.peek_nth(1)) {
        (Some(current), Some(next)) => {
            next.token == Token::Star && current.location.precedes(next.location)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::make_input;
    use pretty_assertions::assert_eq;

    fn lit(value: i64, start: usize, end: usize) -> AstNode {
        AstNode::Literal(Literal {
            value: LiteralValue::Integer(value),
            location: Location::new(start, end),
        })
    }

    fn col(name: &str, start: usize, end: usize) -> AstNode {
        AstNode::Column(Column::new(
            vec![name.to_string()],
            false,
            Location::new(start, end),
        ))
    }

    fn bin(name: &str, left: AstNode, right: AstNode, start: usize, end: usize) -> AstNode {
        AstNode::Function(Function {
            name: name.to_string(),
            subtype: FunctionKind::BinaryExpression,
            args: vec![left, right],
            location: Location::new(start, end),
        })
    }

    #[test]
    fn parsing_supports_literals() {
        let cases = [
            ("123", LiteralValue::Integer(123)),
            ("1.5", LiteralValue::Decimal(1.5)),
            ("\"abc\"", LiteralValue::String(String::from("abc"))),
            ("TRUE", LiteralValue::Boolean(true)),
            ("false", LiteralValue::Boolean(false)),
            ("null", LiteralValue::Null),
            ("?", LiteralValue::Param(Param::Unnamed)),
            ("?start", LiteralValue::Param(Param::Named(String::from("start")))),
            ("?3", LiteralValue::Param(Param::Positional(3))),
        ];
        for (source, value) in cases {
            let expected = AstNode::Literal(Literal {
                value,
                location: Location::new(0, source.len()),
            });
            assert_eq!(parse_expression(&mut make_input(source)).unwrap(), expected);
        }
    }

    #[test]
    fn negative_numbers_fold_into_literals() {
        assert_eq!(parse_expression(&mut make_input("-5")).unwrap(), lit(-5, 0, 2));
        let unary = parse_expression(&mut make_input("-a")).unwrap();
        assert_eq!(
            unary,
            AstNode::Function(Function {
                name: String::from("-"),
                subtype: FunctionKind::UnaryExpression,
                args: vec![col("a", 1, 2)],
                location: Location::new(0, 2),
            })
        );
    }

    #[test]
    fn parse_expression_respects_precedence() {
        let expected0 = bin(
            "+",
            lit(0, 0, 1),
            bin("*", lit(1, 4, 5), lit(2, 8, 9), 4, 9),
            0,
            9,
        );
        let expected1 = bin(
            "+",
            bin("*", lit(0, 0, 1), lit(1, 4, 5), 0, 5),
            lit(2, 8, 9),
            0,
            9,
        );

        assert_eq!(parse_expression(&mut make_input("0 + 1 * 2")).unwrap(), expected0);
        assert_eq!(parse_expression(&mut make_input("0 * 1 + 2")).unwrap(), expected1);
    }

    #[test]
    fn parse_expression_respects_associativity() {
        let expected = bin(
            "-",
            bin("-", lit(0, 0, 1), lit(1, 4, 5), 0, 5),
            lit(2, 8, 9),
            0,
            9,
        );
        assert_eq!(parse_expression(&mut make_input("0 - 1 - 2")).unwrap(), expected);
    }

    #[test]
    fn boolean_operators_bind_looser_than_comparisons() {
        let source = "a > 1 and b < 2 or not c";
        let parsed = parse_expression(&mut make_input(source)).unwrap();
        let or = parsed.as_function().unwrap();
        assert_eq!(or.name, "or");
        let and = or.args[0].as_function().unwrap();
        assert_eq!(and.name, "and");
        assert_eq!(and.args[0].as_function().unwrap().name, ">");
        assert_eq!(and.args[1].as_function().unwrap().name, "<");
        let not = or.args[1].as_function().unwrap();
        assert_eq!(not.name, "not");
        assert_eq!(not.subtype, FunctionKind::UnaryExpression);
    }

    #[test]
    fn parsing_supports_predicates() {
        let cases = [
            ("a LIKE \"x*\"", "like"),
            ("a NOT LIKE \"x*\"", "not like"),
            ("a RLIKE \"x.*\"", "rlike"),
            ("a IN (1, 2)", "in"),
            ("a NOT IN (1, 2)", "not in"),
            ("a IS NULL", "is null"),
            ("a IS NOT NULL", "is not null"),
        ];
        for (source, name) in cases {
            let parsed = parse_expression(&mut make_input(source)).unwrap();
            let function = parsed.as_function().unwrap();
            assert_eq!(function.name, name, "{}", source);
            assert_eq!(function.location, Location::new(0, source.len()), "{}", source);
        }

        let parsed = parse_expression(&mut make_input("a IN (1, 2)")).unwrap();
        let list = parsed.as_function().unwrap().args[1].as_list().unwrap();
        assert_eq!(list.values, vec![lit(1, 6, 7), lit(2, 9, 10)]);
    }

    #[test]
    fn function_calls_nest() {
        let parsed = parse_expression(&mut make_input("ROUND(AVG(bytes), 2)")).unwrap();
        let round = parsed.as_function().unwrap();
        assert_eq!(round.name, "round");
        assert_eq!(round.subtype, FunctionKind::VariadicCall);
        assert_eq!(round.location, Location::new(0, 20));
        let avg = round.args[0].as_function().unwrap();
        assert_eq!(avg.name, "avg");
        assert_eq!(avg.args, vec![col("bytes", 10, 15)]);
        assert_eq!(round.args[1], lit(2, 18, 19));
    }

    #[test]
    fn count_star_takes_a_star_column() {
        let parsed = parse_expression(&mut make_input("COUNT(*)")).unwrap();
        let count = parsed.as_function().unwrap();
        assert_eq!(count.args, vec![col("*", 6, 7)]);
    }

    #[test]
    fn unclosed_call_reports_the_open_paren() {
        let error = parse_expression(&mut make_input("f(1, g(2)")).unwrap_err();
        assert_eq!(
            error,
            ParserError::Syntax {
                message: String::from("Unbalanced parenthesis: '(' is never closed"),
                location: Location::new(1, 2),
            }
        );
    }

    #[test]
    fn qualified_names_join_parts() {
        let column = parse_qualified_name(&mut make_input("host.`os name`.x")).unwrap();
        assert_eq!(column.name, "host.os name.x");
        assert_eq!(column.parts, vec!["host", "os name", "x"]);
        assert!(column.quoted);
        assert_eq!(column.location, Location::new(0, 16));
    }

    #[test]
    fn patterns_glue_wildcards() {
        let cases = [("host.*", "host.*"), ("*_bytes", "*_bytes"), ("a*b", "a*b"), ("*", "*")];
        for (source, name) in cases {
            let column = parse_qualified_name_pattern(&mut make_input(source)).unwrap();
            assert_eq!(column.name, name);
            assert!(column.is_pattern());
        }

        let mut input = make_input("a *");
        let column = parse_qualified_name_pattern(&mut input).unwrap();
        assert_eq!(column.name, "a");
        assert!(input.peek_is(&Token::Star));
    }

    #[test]
    fn inline_cast_records_target_type() {
        let parsed = parse_expression(&mut make_input("a::INTEGER")).unwrap();
        let cast = parsed.as_function().unwrap();
        assert_eq!(cast.subtype, FunctionKind::InlineCast);
        assert_eq!(
            cast.args[1].as_literal().map(|l| &l.value),
            Some(&LiteralValue::String(String::from("integer")))
        );
    }
}
