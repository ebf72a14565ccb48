use log::trace;

use crate::ast::{
    AstNode, Column, Command, CommandOption, Function, FunctionKind, Literal, LiteralValue,
    NullsPosition, Order, SortDirection, Source,
};
use crate::lexer::Token;
use crate::spans::Location;

use super::expression::{parse_expression, parse_qualified_name, parse_qualified_name_pattern};
use super::{parse_term, ParseInput, ParserError, SyntaxError};

/// Command keywords this parser knows, lowercased.
pub const COMMANDS: &[&str] = &[
    "dissect",
    "drop",
    "enrich",
    "eval",
    "from",
    "grok",
    "inlinestats",
    "keep",
    "limit",
    "mv_expand",
    "rename",
    "row",
    "show",
    "sort",
    "stats",
    "where",
];

/// Parses `command ('|' command)*`.
///
/// A failing command is kept as `incomplete` with whatever arguments were
/// parsed, its error is recorded, and parsing resumes after the next pipe.
pub fn parse_query(input: &mut ParseInput, errors: &mut Vec<SyntaxError>) -> Vec<Command> {
    let mut commands = Vec::new();
    if input.done() {
        return commands;
    }

    loop {
        match input.peek_token() {
            None => break,
            Some(Token::Pipe) => {
                let error = input.unexpected("a command");
                record(input, errors, error);
            }
            Some(_) => {
                if let Some(command) = parse_command(input, errors) {
                    commands.push(command);
                }
            }
        }

        if let Some(pipe) = input.next_if(Token::Pipe) {
            if input.done() {
                let error = input.error_at(pipe, "Expected a command after '|'");
                record(input, errors, error);
                break;
            }
        }
    }

    commands
}

fn record(input: &ParseInput, errors: &mut Vec<SyntaxError>, error: ParserError) {
    if let Some(error) = input.to_syntax_error(error) {
        trace!(start = error.location.start, end = error.location.end; "Recorded syntax error: {}", error.message);
        errors.push(error);
    }
}

fn parse_command(input: &mut ParseInput, errors: &mut Vec<SyntaxError>) -> Option<Command> {
    let name = match parse_term(input) {
        Ok(name) => name,
        Err(error) => {
            record(input, errors, error);
            input.skip_to_pipe();
            return None;
        }
    };

    let keyword = name.value.to_lowercase();
    if !COMMANDS.contains(&keyword.as_str()) {
        let error = input.error_at(
            name.location,
            format!("Unknown command '{}'", name.value),
        );
        record(input, errors, error);
        input.skip_to_pipe();
        return None;
    }

    let mut command = Command::new(keyword, name.location);
    let result = match command.name.as_str() {
        "from" => parse_from(input, &mut command),
        "row" => parse_fields(input, &mut command.args),
        "show" => parse_show(input, &mut command),
        "where" => parse_where(input, &mut command),
        "eval" => parse_fields(input, &mut command.args),
        "stats" | "inlinestats" => parse_stats(input, &mut command),
        "keep" | "drop" => parse_patterns(input, &mut command.args),
        "rename" => parse_rename(input, &mut command),
        "sort" => parse_sort(input, &mut command),
        "limit" => parse_limit(input, &mut command),
        "mv_expand" => parse_mv_expand(input, &mut command),
        "dissect" | "grok" => parse_pattern_command(input, &mut command),
        "enrich" => parse_enrich(input, &mut command),
        _ => unreachable!("command list and dispatch disagree"),
    }
    .and_then(|_| expect_end_of_command(input));

    if let Err(error) = result {
        command.incomplete = true;
        record(input, errors, error);
        input.skip_to_pipe();
        trace!(command = command.name.as_str(); "Resynchronized at next pipe");
    }

    if let Some(last) = input.previous_location() {
        command.location = command.location.join(last);
    }
    Some(command)
}

fn expect_end_of_command(input: &mut ParseInput) -> Result<(), ParserError> {
    match input.peek_token() {
        None | Some(Token::Pipe) => Ok(()),
        Some(Token::RParen) => Err(input.error_at(
            input.peek().map(|data| data.location).unwrap_or_default(),
            "Unbalanced parenthesis: ')' has no matching '('",
        )),
        Some(_) => Err(input.unexpected("'|' or end of query")),
    }
}

fn at_command_end(input: &ParseInput) -> bool {
    matches!(input.peek_token(), None | Some(Token::Pipe))
}

/// `FROM index[, index...] [METADATA field[, field...]]`
fn parse_from(input: &mut ParseInput, command: &mut Command) -> Result<(), ParserError> {
    command.args.push(parse_source(input)?);
    while input.next_if(Token::Comma).is_some() {
        command.args.push(parse_source(input)?);
    }

    if let Some(keyword) = input.next_if_word("metadata") {
        let mut option = CommandOption {
            name: String::from("metadata"),
            args: Vec::new(),
            location: keyword,
        };
        let result = parse_column_list(input, &mut option.args);
        option.location = option.args.iter().fold(keyword, |loc, arg| loc.join(arg.location()));
        command.args.push(AstNode::Option(option));
        result?;
    }
    Ok(())
}

fn parse_column_list(input: &mut ParseInput, args: &mut Vec<AstNode>) -> Result<(), ParserError> {
    args.push(AstNode::Column(parse_qualified_name(input)?));
    while input.next_if(Token::Comma).is_some() {
        args.push(AstNode::Column(parse_qualified_name(input)?));
    }
    Ok(())
}

/// Index names are not single tokens: `logs-*`, `.ds-web.2024`, `remote:logs`
/// all lex as several adjacent tokens, which are glued back together here.
fn parse_source(input: &mut ParseInput) -> Result<AstNode, ParserError> {
    if let Some(Token::StringLiteral(value)) = input.peek_token() {
        let name = value.clone();
        let location = input.next()?.location;
        return Ok(AstNode::Source(source_node(name, location)));
    }

    let mut location: Option<Location> = None;
    while let Some(next) = input.peek() {
        if let Some(current) = location {
            if !current.precedes(next.location) {
                break;
            }
        }
        let glues = match &next.token {
            Token::Term(word) => location.is_some() || !word.eq_ignore_ascii_case("metadata"),
            Token::QuotedTerm(_)
            | Token::IntegerLiteral(_)
            | Token::DecimalLiteral(_)
            | Token::Star
            | Token::Sub
            | Token::Add
            | Token::Dot
            | Token::Colon
            | Token::Mod => true,
            _ => false,
        };
        if !glues {
            break;
        }
        let part = next.location;
        location = Some(location.map_or(part, |current| current.join(part)));
        input.next()?;
    }

    match location {
        Some(location) => {
            let text = input
                .source()
                .get(location.start..location.end)
                .unwrap_or_default()
                .replace('`', "");
            Ok(AstNode::Source(source_node(text, location)))
        }
        None => Err(input.unexpected("an index pattern")),
    }
}

fn source_node(name: String, location: Location) -> Source {
    let (cluster, index) = match name.split_once(':') {
        Some((cluster, index)) => (Some(cluster.to_string()), index.to_string()),
        None => (None, name.clone()),
    };
    Source {
        name,
        cluster,
        index,
        location,
    }
}

/// `SHOW INFO`
fn parse_show(input: &mut ParseInput, command: &mut Command) -> Result<(), ParserError> {
    let info = input.assert_word("info")?;
    command.args.push(AstNode::Function(Function {
        name: String::from("info"),
        subtype: FunctionKind::VariadicCall,
        args: Vec::new(),
        location: info,
    }));
    Ok(())
}

fn parse_where(input: &mut ParseInput, command: &mut Command) -> Result<(), ParserError> {
    command.args.push(parse_expression(input)?);
    Ok(())
}

/// Comma-separated `[name =] expression` list, as in ROW and EVAL.
fn parse_fields(input: &mut ParseInput, args: &mut Vec<AstNode>) -> Result<(), ParserError> {
    args.push(parse_field(input)?);
    while input.next_if(Token::Comma).is_some() {
        args.push(parse_field(input)?);
    }
    Ok(())
}

fn parse_field(input: &mut ParseInput) -> Result<AstNode, ParserError> {
    let checkpoint = input.checkpoint();
    if let Ok(column) = parse_qualified_name(input) {
        if input.next_if(Token::Assign).is_some() {
            let value = parse_expression(input)?;
            return Ok(assignment(AstNode::Column(column), value));
        }
    }
    input.restore(checkpoint);
    parse_expression(input)
}

fn assignment(target: AstNode, value: AstNode) -> AstNode {
    let location = target.location().join(value.location());
    AstNode::Function(Function {
        name: String::from("="),
        subtype: FunctionKind::BinaryExpression,
        args: vec![target, value],
        location,
    })
}

/// `STATS [fields] [BY groupings]`
fn parse_stats(input: &mut ParseInput, command: &mut Command) -> Result<(), ParserError> {
    if !at_command_end(input) && !input.peek_word("by") {
        parse_fields(input, &mut command.args)?;
    }

    if let Some(keyword) = input.next_if_word("by") {
        let mut option = CommandOption {
            name: String::from("by"),
            args: Vec::new(),
            location: keyword,
        };
        let result = parse_fields(input, &mut option.args);
        option.location = option.args.iter().fold(keyword, |loc, arg| loc.join(arg.location()));
        command.args.push(AstNode::Option(option));
        result?;
    }
    Ok(())
}

/// Comma-separated column patterns, as in KEEP and DROP.
fn parse_patterns(input: &mut ParseInput, args: &mut Vec<AstNode>) -> Result<(), ParserError> {
    args.push(AstNode::Column(parse_qualified_name_pattern(input)?));
    while input.next_if(Token::Comma).is_some() {
        args.push(AstNode::Column(parse_qualified_name_pattern(input)?));
    }
    Ok(())
}

/// `RENAME old AS new, ...` or `RENAME new = old, ...`
fn parse_rename(input: &mut ParseInput, command: &mut Command) -> Result<(), ParserError> {
    loop {
        let first = AstNode::Column(parse_qualified_name_pattern(input)?);
        let clause = if input.next_if_word("as").is_some() {
            let second = AstNode::Column(parse_qualified_name_pattern(input)?);
            let location = first.location().join(second.location());
            AstNode::Function(Function {
                name: String::from("as"),
                subtype: FunctionKind::BinaryExpression,
                args: vec![first, second],
                location,
            })
        } else if input.next_if(Token::Assign).is_some() {
            let second = AstNode::Column(parse_qualified_name_pattern(input)?);
            assignment(first, second)
        } else {
            return Err(input.unexpected("AS or '='"));
        };
        command.args.push(clause);

        if input.next_if(Token::Comma).is_none() {
            return Ok(());
        }
    }
}

/// `SORT expr [ASC|DESC] [NULLS FIRST|LAST], ...`
fn parse_sort(input: &mut ParseInput, command: &mut Command) -> Result<(), ParserError> {
    loop {
        let expression = parse_expression(input)?;
        let mut location = expression.location();

        let direction = if let Some(asc) = input.next_if_word("asc") {
            location = location.join(asc);
            Some(SortDirection::Asc)
        } else if let Some(desc) = input.next_if_word("desc") {
            location = location.join(desc);
            Some(SortDirection::Desc)
        } else {
            None
        };

        let nulls = if input.next_if_word("nulls").is_some() {
            if let Some(first) = input.next_if_word("first") {
                location = location.join(first);
                Some(NullsPosition::First)
            } else if let Some(last) = input.next_if_word("last") {
                location = location.join(last);
                Some(NullsPosition::Last)
            } else {
                return Err(input.unexpected("FIRST or LAST"));
            }
        } else {
            None
        };

        command.args.push(AstNode::Order(Order {
            expression: Box::new(expression),
            direction,
            nulls,
            location,
        }));

        if input.next_if(Token::Comma).is_none() {
            return Ok(());
        }
    }
}

/// `LIMIT n`
fn parse_limit(input: &mut ParseInput, command: &mut Command) -> Result<(), ParserError> {
    let next = match input.peek() {
        Some(next) => next.clone(),
        None => return Err(input.unexpected("a row count")),
    };
    let value = match next.token {
        Token::IntegerLiteral(value) => LiteralValue::Integer(value),
        Token::Param | Token::NamedParam(_) | Token::PositionalParam(_) => {
            return parse_expression(input).map(|param| command.args.push(param));
        }
        _ => return Err(input.unexpected("a row count")),
    };
    input.next()?;
    command.args.push(AstNode::Literal(Literal {
        value,
        location: next.location,
    }));
    Ok(())
}

/// `MV_EXPAND column`
fn parse_mv_expand(input: &mut ParseInput, command: &mut Command) -> Result<(), ParserError> {
    command.args.push(AstNode::Column(parse_qualified_name(input)?));
    Ok(())
}

/// `DISSECT expr "pattern" [option = value ...]` and `GROK expr "pattern"`
fn parse_pattern_command(input: &mut ParseInput, command: &mut Command) -> Result<(), ParserError> {
    command.args.push(parse_expression(input)?);

    match input.peek() {
        Some(next) => {
            let next = next.clone();
            match next.token {
                Token::StringLiteral(pattern) => {
                    input.next()?;
                    command.args.push(AstNode::Literal(Literal {
                        value: LiteralValue::String(pattern),
                        location: next.location,
                    }));
                }
                _ => return Err(input.unexpected("a pattern string")),
            }
        }
        None => return Err(input.unexpected("a pattern string")),
    }

    while let Some(Token::Term(_)) = input.peek_token() {
        let name = parse_term(input)?;
        input.assert_next(Token::Assign, "'=' after option name")?;
        let value = parse_expression(input)?;
        let location = name.location.join(value.location());
        command.args.push(AstNode::Option(CommandOption {
            name: name.value.to_lowercase(),
            args: vec![value],
            location,
        }));
    }
    Ok(())
}

/// `ENRICH policy [ON column] [WITH [new =] field, ...]`
fn parse_enrich(input: &mut ParseInput, command: &mut Command) -> Result<(), ParserError> {
    command.args.push(parse_source(input)?);

    if let Some(on) = input.next_if_word("on") {
        let column = parse_qualified_name_pattern(input)?;
        let location = on.join(column.location);
        command.args.push(AstNode::Option(CommandOption {
            name: String::from("on"),
            args: vec![AstNode::Column(column)],
            location,
        }));
    }

    if let Some(with) = input.next_if_word("with") {
        let mut option = CommandOption {
            name: String::from("with"),
            args: Vec::new(),
            location: with,
        };
        let result = parse_enrich_fields(input, &mut option.args);
        option.location = option.args.iter().fold(with, |loc, arg| loc.join(arg.location()));
        command.args.push(AstNode::Option(option));
        result?;
    }
    Ok(())
}

fn parse_enrich_fields(input: &mut ParseInput, args: &mut Vec<AstNode>) -> Result<(), ParserError> {
    loop {
        let first: Column = parse_qualified_name_pattern(input)?;
        if input.next_if(Token::Assign).is_some() {
            let second = parse_qualified_name_pattern(input)?;
            args.push(assignment(AstNode::Column(first), AstNode::Column(second)));
        } else {
            args.push(AstNode::Column(first));
        }

        if input.next_if(Token::Comma).is_none() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::make_input;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> (Vec<Command>, Vec<SyntaxError>) {
        let mut input = make_input(source);
        let mut errors = Vec::new();
        let commands = parse_query(&mut input, &mut errors);
        (commands, errors)
    }

    fn names(commands: &[Command]) -> Vec<&str> {
        commands.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn parses_pipeline_in_order() {
        let (commands, errors) =
            parse("FROM logs | WHERE a > 1 | EVAL b = a * 2 | KEEP a, b | LIMIT 10");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(names(&commands), vec!["from", "where", "eval", "keep", "limit"]);
    }

    #[test]
    fn command_keywords_are_case_insensitive() {
        let (commands, errors) = parse("from logs | Where a > 1 | sTaTs count(*)");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(names(&commands), vec!["from", "where", "stats"]);
    }

    #[test]
    fn from_glues_index_patterns() {
        let (commands, errors) = parse("FROM logs-*, .ds-web.2024, remote:metrics*");
        assert!(errors.is_empty(), "{:?}", errors);
        let sources: Vec<&Source> = commands[0].args.iter().filter_map(AstNode::as_source).collect();
        assert_eq!(
            sources.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["logs-*", ".ds-web.2024", "remote:metrics*"]
        );
        assert_eq!(sources[2].cluster.as_deref(), Some("remote"));
        assert_eq!(sources[2].index, "metrics*");
        assert_eq!(sources[0].location, Location::new(5, 11));
    }

    #[test]
    fn from_metadata_is_an_option() {
        let (commands, errors) = parse("FROM logs METADATA _id, _index");
        assert!(errors.is_empty(), "{:?}", errors);
        let metadata = commands[0].option("metadata").unwrap();
        assert_eq!(metadata.location, Location::new(10, 30));
        let fields: Vec<&str> = metadata
            .args
            .iter()
            .filter_map(AstNode::as_column)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(fields, vec!["_id", "_index"]);
    }

    #[test]
    fn stats_groupings_are_a_by_option() {
        let (commands, errors) = parse("FROM logs | STATS c = COUNT(*), m = MAX(bytes) BY host, day");
        assert!(errors.is_empty(), "{:?}", errors);
        let stats = &commands[1];
        assert_eq!(stats.args.len(), 3);
        assert_eq!(stats.args[0].as_function().unwrap().name, "=");
        let by = stats.option("by").unwrap();
        assert_eq!(by.args.len(), 2);

        let (commands, errors) = parse("FROM logs | STATS BY host");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(commands[1].args.len(), 1);
        assert!(commands[1].args[0].is_option());
    }

    #[test]
    fn sort_keys_carry_direction_and_nulls() {
        let (commands, errors) = parse("FROM a | SORT x DESC NULLS LAST, y");
        assert!(errors.is_empty(), "{:?}", errors);
        let orders: Vec<&Order> = commands[1]
            .args
            .iter()
            .filter_map(|arg| match arg {
                AstNode::Order(order) => Some(order),
                _ => None,
            })
            .collect();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].direction, Some(SortDirection::Desc));
        assert_eq!(orders[0].nulls, Some(NullsPosition::Last));
        assert_eq!(orders[0].location, Location::new(14, 31));
        assert_eq!(orders[1].direction, None);
    }

    #[test]
    fn rename_accepts_both_forms() {
        let (commands, errors) = parse("FROM a | RENAME x AS y, z = w");
        assert!(errors.is_empty(), "{:?}", errors);
        let functions: Vec<&str> = commands[1]
            .args
            .iter()
            .filter_map(AstNode::as_function)
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(functions, vec!["as", "="]);
    }

    #[test]
    fn enrich_options() {
        let (commands, errors) = parse("FROM a | ENRICH langs ON code WITH name = language_name, region");
        assert!(errors.is_empty(), "{:?}", errors);
        let enrich = &commands[1];
        assert_eq!(enrich.args[0].as_source().unwrap().name, "langs");
        assert_eq!(enrich.option("on").unwrap().args.len(), 1);
        assert_eq!(enrich.option("with").unwrap().args.len(), 2);
    }

    #[test]
    fn dissect_takes_pattern_and_options() {
        let (commands, errors) =
            parse(r#"FROM a | DISSECT message "%{date} %{msg}" APPEND_SEPARATOR = "-""#);
        assert!(errors.is_empty(), "{:?}", errors);
        let dissect = &commands[1];
        assert_eq!(dissect.args.len(), 3);
        assert!(dissect.args[1].is_literal());
        assert!(dissect.option("append_separator").is_some());
    }

    #[test]
    fn show_info_and_mv_expand() {
        let (commands, errors) = parse("SHOW INFO");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(commands[0].args[0].as_function().unwrap().name, "info");

        let (commands, errors) = parse("FROM a | MV_EXPAND tags");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(commands[1].args[0].as_column().unwrap().name, "tags");
    }

    #[test]
    fn malformed_command_is_kept_incomplete() {
        let (commands, errors) = parse("FROM logs | WHERE (a > 1 | LIMIT 5");
        assert_eq!(names(&commands), vec!["from", "where", "limit"]);
        assert!(commands[1].incomplete);
        assert!(!commands[2].incomplete);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location, Location::new(18, 19));
    }

    #[test]
    fn unknown_command_is_skipped() {
        let (commands, errors) = parse("FROM logs | FROBNICATE x y | LIMIT 1");
        assert_eq!(names(&commands), vec!["from", "limit"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unknown command 'FROBNICATE'");
        assert_eq!(errors[0].location, Location::new(12, 22));
    }

    #[test]
    fn every_bad_stage_is_reported() {
        let (commands, errors) = parse("FROM logs | WHERE | LIMIT x | KEEP a");
        assert_eq!(names(&commands), vec!["from", "where", "limit", "keep"]);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].location.start < errors[1].location.start);
    }

    #[test]
    fn empty_stages_are_reported_at_the_pipe() {
        let (commands, errors) = parse("FROM logs | | LIMIT 1");
        assert_eq!(names(&commands), vec!["from", "limit"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location, Location::new(12, 13));

        let (commands, errors) = parse("FROM logs |");
        assert_eq!(names(&commands), vec!["from"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Expected a command after '|'");
        assert_eq!(errors[0].location, Location::new(10, 11));
    }

    #[test]
    fn trailing_tokens_are_an_error() {
        let (commands, errors) = parse("ROW 1)");
        assert_eq!(commands.len(), 1);
        assert!(commands[0].incomplete);
        assert_eq!(commands[0].args.len(), 1);
        assert_eq!(errors[0].location, Location::new(5, 6));
    }

    #[test]
    fn incomplete_command_keeps_parsed_args() {
        let (commands, errors) = parse("FROM logs METADATA");
        assert_eq!(errors.len(), 1);
        assert!(commands[0].incomplete);
        assert!(commands[0].args[0].is_source());
        assert!(commands[0].option("metadata").is_some());
    }

    #[test]
    fn command_location_spans_all_arguments() {
        let (commands, _) = parse("FROM logs | WHERE a > 1");
        assert_eq!(commands[0].location, Location::new(0, 9));
        assert_eq!(commands[1].location, Location::new(12, 23));
    }
}
