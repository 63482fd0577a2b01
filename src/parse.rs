use serde::Deserialize;

use crate::dictionary::{match_tokens, Associativity, Entry, Kind, ParseStrategy, TriggerMatch};
use crate::domain::{Domain, DomainLiteral};
use crate::engine::Engine;
use crate::expression::{ErrorCode, Expression};
use crate::token::{tokens_to_latex, Token};

/// Precedence of the operator implied by juxtaposition, `2x`.
pub const INVISIBLE_OPERATOR_PRECEDENCE: u16 = 390;

/// Spacing commands that are skipped like whitespace.
const SPACING_COMMANDS: &[&str] = &["\\,", "\\;", "\\:", "\\!", "\\ ", "\\quad", "\\qquad"];

/// What to do with a letter or command that no entry claims.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolPromotion {
    /// Report an `unknown-symbol` error.
    None,
    /// Single letters become symbols; unknown commands are errors.
    #[default]
    SingleLetter,
    /// Unknown commands without arguments become symbols as well.
    All,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParserOptions {
    /// Head produced by juxtaposition, or `None` to disable it.
    pub invisible_operator: Option<String>,
    pub promote_unknown_symbols: SymbolPromotion,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            invisible_operator: Some("Multiply".to_string()),
            promote_unknown_symbols: SymbolPromotion::default(),
        }
    }
}

/// Where the expression being parsed must stop.
#[derive(Clone, Copy, Debug, Default)]
pub struct Terminator<'t> {
    /// Operators binding less tightly than this end the expression.
    pub min_prec: u16,
    /// Closing trigger of the enclosing matchfix, if any.
    pub close: Option<&'t [Token]>,
}

impl<'t> Terminator<'t> {
    pub fn with_min_prec(&self, min_prec: u16) -> Self {
        Self {
            min_prec,
            close: self.close,
        }
    }
}

/// A saved cursor position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    index: usize,
}

/// Operator-precedence parser over a token stream.
///
/// The parser never fails: anything it cannot make sense of becomes an
/// `Error` node in the tree and parsing resumes after it.
pub struct Parser<'a> {
    engine: &'a Engine,
    tokens: &'a [Token],
    index: usize,
}

impl<'a> Parser<'a> {
    pub fn new(engine: &'a Engine, tokens: &'a [Token]) -> Self {
        Self {
            engine,
            tokens,
            index: 0,
        }
    }

    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint { index: self.index }
    }

    pub fn rewind(&mut self, checkpoint: Checkpoint) {
        self.index = checkpoint.index;
    }

    pub fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.index)
    }

    pub fn skip_space(&mut self) {
        while let Some(token) = self.tokens.get(self.index) {
            let spacing = match token {
                Token::Space => true,
                Token::Command(name) => SPACING_COMMANDS.contains(&name.as_str()),
                _ => false,
            };
            if !spacing {
                break;
            }
            self.index += 1;
        }
    }

    /// Build a normalized function call.
    pub fn function(&self, head: &str, ops: Vec<Expression>) -> Expression {
        self.engine.function(head, ops)
    }

    pub fn domain(&self, expr: &Expression) -> Domain {
        self.engine.domain(expr)
    }

    /// True if the domain of `expr` is a subdomain of `literal`.
    pub fn is_compatible(&self, expr: &Expression, literal: DomainLiteral) -> bool {
        self.engine.is_compatible(expr, &literal.into())
    }

    /// Parse the whole token stream.
    ///
    /// Tokens left over after an expression are reported as errors and
    /// parsing resumes after them; several parts are combined in a
    /// `Sequence`. Empty input is `Nothing`.
    pub fn parse_root(&mut self) -> Expression {
        let mut parts = Vec::new();
        loop {
            self.skip_space();
            if self.at_end() {
                break;
            }
            match self.parse_expression(&Terminator::default()) {
                Some(expr) => parts.push(expr),
                None => parts.push(self.parse_leftover()),
            }
        }
        match parts.len() {
            0 => Expression::symbol("Nothing"),
            1 => parts.swap_remove(0),
            _ => self.function("Sequence", parts),
        }
    }

    /// Parse an expression until `until` or until no rule applies.
    ///
    /// Returns `None` without moving the cursor if no primary starts here.
    pub fn parse_expression(&mut self, until: &Terminator<'_>) -> Option<Expression> {
        let mut lhs = self.parse_primary(until)?;
        loop {
            self.skip_space();
            if self.at_terminator(until) {
                break;
            }
            let engine = self.engine;
            let candidates =
                engine
                    .dictionary()
                    .candidates(self.tokens, self.index, &[Kind::Infix, Kind::Postfix]);
            let next = if candidates.is_empty() {
                self.parse_invisible(&lhs, until)
            } else {
                candidates
                    .iter()
                    .filter(|m| m.entry.precedence() >= until.min_prec)
                    .find_map(|m| self.apply(m, Some(&lhs), until))
            };
            match next {
                Some(expr) => lhs = expr,
                None => break,
            }
        }
        Some(lhs)
    }

    fn parse_primary(&mut self, until: &Terminator<'_>) -> Option<Expression> {
        self.skip_space();
        if self.at_terminator(until) {
            return None;
        }
        let engine = self.engine;
        let candidates = engine.dictionary().candidates(
            self.tokens,
            self.index,
            &[Kind::Symbol, Kind::Prefix, Kind::Matchfix],
        );
        if let Some(expr) = candidates.iter().find_map(|m| self.apply(m, None, until)) {
            return Some(expr);
        }

        let tokens = self.tokens;
        let start = self.index;
        match &tokens[start] {
            Token::Command(name) if name == "\\begin" => Some(self.parse_environment()),
            Token::Command(name) if name == "\\left" => Some(self.parse_unknown_left()),
            Token::GroupStart => Some(self.parse_group()),
            Token::Char(c) if c.is_ascii_digit() => Some(self.parse_number()),
            Token::Char(c) if c.is_alphabetic() => Some(self.parse_letter(*c)),
            _ if self.at_operator() => None,
            Token::Command(name) => Some(self.parse_unknown_command(name)),
            _ => {
                self.index += 1;
                Some(self.error(ErrorCode::UnexpectedToken, None, start))
            }
        }
    }

    /// Run the handler of a matched entry with the cursor past its trigger.
    /// The cursor is restored if the handler rejects the match.
    fn apply(
        &mut self,
        found: &TriggerMatch<'_>,
        lhs: Option<&Expression>,
        until: &Terminator<'_>,
    ) -> Option<Expression> {
        let checkpoint = self.checkpoint();
        self.index = found.end;
        let result = match &found.entry.parse {
            ParseStrategy::Custom(parse) => parse(self, lhs, until),
            _ => self.parse_entry(found.entry, lhs, until, found.start),
        };
        if result.is_none() {
            tracing::trace!(
                trigger = %tokens_to_latex(&self.tokens[found.start..found.end]),
                "candidate rejected"
            );
            self.rewind(checkpoint);
        }
        result
    }

    fn parse_entry(
        &mut self,
        entry: &Entry,
        lhs: Option<&Expression>,
        until: &Terminator<'_>,
        start: usize,
    ) -> Option<Expression> {
        let head = entry.head()?;
        let precedence = entry.precedence();
        match entry.kind {
            Kind::Symbol => Some(Expression::symbol(head)),
            Kind::Prefix => {
                let operand = self
                    .parse_expression(&until.with_min_prec(precedence + 1))
                    .unwrap_or_else(missing);
                Some(self.function(head, vec![operand]))
            }
            Kind::Infix => {
                let lhs = lhs?.clone();
                let min_prec = match entry.associativity {
                    Associativity::Right => precedence,
                    Associativity::Left | Associativity::NonAssociative => precedence + 1,
                };
                let rhs = self
                    .parse_expression(&until.with_min_prec(min_prec))
                    .unwrap_or_else(missing);
                Some(self.function(head, vec![lhs, rhs]))
            }
            Kind::Postfix => Some(self.function(head, vec![lhs?.clone()])),
            Kind::Matchfix => Some(self.parse_matchfix(entry, head, start)),
            Kind::Environment => None,
        }
    }

    fn parse_matchfix(&mut self, entry: &Entry, head: &str, start: usize) -> Expression {
        let close = entry.close.as_ref().map_or(&[][..], |c| c.tokens.as_slice());
        let body = self.parse_expression(&Terminator {
            min_prec: 0,
            close: Some(close),
        });
        self.skip_space();
        match match_tokens(self.tokens, self.index, close) {
            Some(end) => self.index = end,
            None => return self.error(ErrorCode::ExpectedClosingDelimiter, None, start),
        }
        let ops = match body {
            // The elements of a comma list, including those that failed.
            Some(body) if head != "Delimiter" && body.head_name() == Some("Sequence") => {
                body.ops().to_vec()
            }
            body => body.into_iter().collect(),
        };
        self.function(head, ops)
    }

    /// Juxtaposition: `2x` is `Multiply(2, x)`.
    fn parse_invisible(&mut self, lhs: &Expression, until: &Terminator<'_>) -> Option<Expression> {
        let head = self.engine.options().invisible_operator.as_deref()?;
        if INVISIBLE_OPERATOR_PRECEDENCE < until.min_prec {
            return None;
        }
        let rhs = self.parse_expression(&until.with_min_prec(INVISIBLE_OPERATOR_PRECEDENCE + 1))?;
        Some(self.function(head, vec![lhs.clone(), rhs]))
    }

    fn parse_group(&mut self) -> Expression {
        let start = self.index;
        self.index += 1;
        let body = self.parse_expression(&Terminator::default());
        self.skip_space();
        if self.peek() != Some(&Token::GroupEnd) {
            return self.error(ErrorCode::ExpectedClosingDelimiter, None, start);
        }
        self.index += 1;
        body.unwrap_or_else(|| self.function("Sequence", vec![]))
    }

    fn parse_number(&mut self) -> Expression {
        let mut text = String::new();
        self.take_digits(&mut text);
        let fraction = self.peek().is_some_and(|t| t.is_char('.'))
            && self.tokens.get(self.index + 1).is_some_and(is_digit);
        if fraction {
            self.index += 1;
            text.push('.');
            self.take_digits(&mut text);
            return Expression::float(text.parse().unwrap_or(f64::NAN));
        }
        match text.parse::<i64>() {
            Ok(value) => Expression::integer(value),
            Err(_) => Expression::float(text.parse().unwrap_or(f64::NAN)),
        }
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(Token::Char(c)) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(*c);
            self.index += 1;
        }
    }

    fn parse_letter(&mut self, letter: char) -> Expression {
        let start = self.index;
        self.index += 1;
        let name = letter.to_string();
        match self.engine.options().promote_unknown_symbols {
            SymbolPromotion::None => self.error(ErrorCode::UnknownSymbol, Some(&name), start),
            SymbolPromotion::SingleLetter | SymbolPromotion::All => Expression::symbol(&name),
        }
    }

    fn parse_unknown_command(&mut self, name: &str) -> Expression {
        let start = self.index;
        self.index += 1;
        let has_arguments = self.peek() == Some(&Token::GroupStart);
        if !has_arguments && self.engine.options().promote_unknown_symbols == SymbolPromotion::All {
            return Expression::symbol(name.trim_start_matches('\\'));
        }
        while self.peek() == Some(&Token::GroupStart) {
            self.skip_group();
        }
        self.error(ErrorCode::UnexpectedCommand, Some(name), start)
    }

    /// `\left` followed by a delimiter no entry is registered for. The
    /// content up to the matching `\right<d>` is skipped.
    fn parse_unknown_left(&mut self) -> Expression {
        let start = self.index;
        self.index += 1;
        self.skip_space();
        if !self.at_end() {
            self.index += 1;
        }
        let error = self.error(ErrorCode::UnexpectedDelimiter, None, start);

        let tokens = self.tokens;
        let mut depth = 1;
        while let Some(token) = tokens.get(self.index) {
            self.index += 1;
            if token.is_command("\\left") {
                depth += 1;
            } else if token.is_command("\\right") {
                depth -= 1;
                if depth == 0 {
                    self.skip_space();
                    if !self.at_end() {
                        self.index += 1;
                    }
                    break;
                }
            }
        }
        error
    }

    fn parse_environment(&mut self) -> Expression {
        let start = self.index;
        self.index += 1;
        let Some(name) = self.parse_group_text() else {
            return self.error(ErrorCode::UnexpectedCommand, Some("\\begin"), start);
        };
        let engine = self.engine;
        let Some(entry) = engine.dictionary().environment(&name) else {
            self.skip_environment();
            return self.error(ErrorCode::UnknownEnvironment, Some(&name), start);
        };

        let body = match &entry.parse {
            ParseStrategy::Custom(parse) => parse(self, None, &Terminator::default()),
            _ => entry.head().map(|head| {
                let rows = self.parse_tabular();
                self.function(head, vec![rows])
            }),
        };
        self.skip_space();
        if !self.match_environment_end(&name) {
            self.skip_environment();
            return self.error(ErrorCode::ExpectedClosingDelimiter, Some(&name), start);
        }
        match body {
            Some(body) => body,
            None => self.error(ErrorCode::SyntaxError, Some(&name), start),
        }
    }

    /// Cells separated by `&` in rows separated by `\\`, as a `List` of
    /// `List` rows. Empty cells are `Nothing`.
    pub fn parse_tabular(&mut self) -> Expression {
        let mut rows = Vec::new();
        loop {
            let mut cells = Vec::new();
            loop {
                let cell = self.parse_expression(&Terminator::default());
                self.skip_space();
                let separator = self.peek().is_some_and(|t| t.is_char('&'));
                if cell.is_some() || separator || !cells.is_empty() {
                    cells.push(cell.unwrap_or_else(|| Expression::symbol("Nothing")));
                }
                if !separator {
                    break;
                }
                self.index += 1;
            }
            if !cells.is_empty() {
                rows.push(self.function("List", cells));
            }
            if !self.peek().is_some_and(|t| t.is_command("\\\\")) {
                break;
            }
            self.index += 1;
        }
        self.function("List", rows)
    }

    /// The text of a `{...}` argument, as for environment names.
    fn parse_group_text(&mut self) -> Option<String> {
        self.skip_space();
        if self.peek() != Some(&Token::GroupStart) {
            return None;
        }
        self.index += 1;
        let mut text = String::new();
        while let Some(token) = self.peek() {
            self.index += 1;
            if *token == Token::GroupEnd {
                return Some(text.trim().to_string());
            }
            text.push_str(&token.to_string());
        }
        Some(text.trim().to_string())
    }

    fn match_environment_end(&mut self, name: &str) -> bool {
        let checkpoint = self.checkpoint();
        if self.peek().is_some_and(|t| t.is_command("\\end")) {
            self.index += 1;
            if self.parse_group_text().as_deref() == Some(name) {
                return true;
            }
        }
        self.rewind(checkpoint);
        false
    }

    /// Skip past the `\end{...}` that closes the current environment.
    fn skip_environment(&mut self) {
        let mut depth = 1usize;
        while let Some(token) = self.peek() {
            self.index += 1;
            if token.is_command("\\begin") {
                depth += 1;
            } else if token.is_command("\\end") {
                depth -= 1;
                if depth == 0 {
                    self.parse_group_text();
                    return;
                }
            }
        }
    }

    fn skip_group(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            self.index += 1;
            match token {
                Token::GroupStart => depth += 1,
                Token::GroupEnd => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// A token that cannot start or continue an expression at top level.
    fn parse_leftover(&mut self) -> Expression {
        let tokens = self.tokens;
        let start = self.index;
        let token = &tokens[start];
        let engine = self.engine;
        self.index += 1;

        let code = if token.is_command("\\right") {
            self.skip_space();
            if !self.at_end() {
                self.index += 1;
            }
            ErrorCode::UnexpectedDelimiter
        } else if token.is_command("\\end") {
            self.parse_group_text();
            ErrorCode::UnexpectedDelimiter
        } else if *token == Token::GroupEnd || engine.dictionary().is_closer(token) {
            ErrorCode::UnexpectedDelimiter
        } else if let Some(found) =
            engine
                .dictionary()
                .lookup(tokens, start, &[Kind::Infix, Kind::Postfix, Kind::Prefix])
        {
            self.index = found.end;
            ErrorCode::UnexpectedOperator
        } else {
            ErrorCode::UnexpectedToken
        };
        self.error(code, None, start)
    }

    fn at_terminator(&self, until: &Terminator<'_>) -> bool {
        let Some(token) = self.peek() else {
            return true;
        };
        if let Some(close) = until.close {
            if match_tokens(self.tokens, self.index, close).is_some() {
                return true;
            }
        }
        is_boundary(token) || self.engine.dictionary().is_closer(token)
    }

    fn at_operator(&self) -> bool {
        self.engine
            .dictionary()
            .lookup(self.tokens, self.index, &[Kind::Infix, Kind::Postfix])
            .is_some()
    }

    /// An error node whose source is the tokens from `start` to the cursor.
    fn error(&self, code: ErrorCode, arg: Option<&str>, start: usize) -> Expression {
        let raw = tokens_to_latex(&self.tokens[start..self.index]);
        tracing::debug!(%code, %raw, "error node");
        Expression::error(code, arg, Some(&raw))
    }
}

fn missing() -> Expression {
    Expression::error(ErrorCode::Missing, None, None)
}

fn is_digit(token: &Token) -> bool {
    matches!(token, Token::Char(c) if c.is_ascii_digit())
}

fn is_boundary(token: &Token) -> bool {
    match token {
        Token::GroupEnd => true,
        Token::Char(c) => *c == '&',
        Token::Command(name) => matches!(name.as_str(), "\\right" | "\\end" | "\\\\"),
        _ => false,
    }
}
