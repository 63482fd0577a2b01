use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::definitions;
use crate::expression::Expression;
use crate::parse::{Parser, Terminator};
use crate::serialize::Serializer;
use crate::token::{tokenize, Token, TokenizeError};

/// Precedence of entries that do not specify one.
pub const DEFAULT_PRECEDENCE: u16 = 810;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Prefix,
    Infix,
    Postfix,
    Matchfix,
    Symbol,
    Environment,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Associativity {
    #[default]
    Left,
    Right,
    NonAssociative,
}

/// Custom parse handler.
///
/// Called with the cursor just past the trigger and, for infix and postfix
/// entries, the left-hand side. Returning `None` rejects the match; the
/// parser then restores the cursor to where it was before the trigger.
pub type ParseFn = fn(&mut Parser<'_>, Option<&Expression>, &Terminator<'_>) -> Option<Expression>;

pub type SerializeFn = fn(&Serializer<'_>, &Expression) -> String;

#[derive(Clone, Debug, Default)]
pub enum ParseStrategy {
    /// Build the entry's canonical head with the default behavior of its kind.
    #[default]
    Default,
    /// Parse-only alias: produce this head instead of a name of its own.
    Alias(String),
    Custom(ParseFn),
}

#[derive(Clone, Debug, Default)]
pub enum SerializeStrategy {
    #[default]
    Default,
    Custom(SerializeFn),
}

/// A trigger as written (LaTeX source) and as matched (tokens).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trigger {
    pub latex: String,
    pub tokens: Vec<Token>,
}

impl Trigger {
    fn new(latex: &str) -> Self {
        Self {
            latex: latex.to_string(),
            tokens: Vec::new(),
        }
    }
}

/// One notation of the dictionary.
#[derive(Clone, Debug)]
pub struct Entry {
    pub name: Option<String>,
    pub triggers: Vec<Trigger>,
    pub kind: Kind,
    pub precedence: Option<u16>,
    pub associativity: Associativity,
    /// Closing trigger of a matchfix entry.
    pub close: Option<Trigger>,
    pub parse: ParseStrategy,
    pub serialize: SerializeStrategy,
}

impl Entry {
    fn new(kind: Kind, name: Option<&str>, triggers: &[&str]) -> Self {
        Self {
            name: name.map(str::to_string),
            triggers: triggers.iter().map(|t| Trigger::new(t)).collect(),
            kind,
            precedence: None,
            associativity: Associativity::default(),
            close: None,
            parse: ParseStrategy::Default,
            serialize: SerializeStrategy::Default,
        }
    }

    pub fn symbol(name: &str, trigger: &str) -> Self {
        Self::new(Kind::Symbol, Some(name), &[trigger])
    }

    pub fn prefix(name: &str, trigger: &str, precedence: u16) -> Self {
        Self::new(Kind::Prefix, Some(name), &[trigger]).with_precedence(precedence)
    }

    pub fn infix(name: &str, trigger: &str, precedence: u16) -> Self {
        Self::new(Kind::Infix, Some(name), &[trigger]).with_precedence(precedence)
    }

    pub fn postfix(name: &str, trigger: &str) -> Self {
        Self::new(Kind::Postfix, Some(name), &[trigger])
    }

    pub fn matchfix(name: &str, open: &str, close: &str) -> Self {
        let mut entry = Self::new(Kind::Matchfix, Some(name), &[open]);
        entry.close = Some(Trigger::new(close));
        entry
    }

    /// `\begin{environment} ... \end{environment}`, producing `name`.
    pub fn environment(name: &str, environment: &str) -> Self {
        Self::new(Kind::Environment, Some(name), &[environment])
    }

    /// Parse-only triggers for an existing canonical `target`.
    pub fn alias(kind: Kind, target: &str, triggers: &[&str]) -> Self {
        let mut entry = Self::new(kind, None, triggers);
        entry.parse = ParseStrategy::Alias(target.to_string());
        entry
    }

    /// An entry that is only a serialization target.
    pub fn serialize_only(name: &str, serialize: SerializeFn) -> Self {
        Self::new(Kind::Symbol, Some(name), &[]).with_serialize(serialize)
    }

    /// A trigger handled entirely by `parse`, with no canonical name.
    pub fn custom(kind: Kind, trigger: &str, parse: ParseFn) -> Self {
        Self::new(kind, None, &[trigger]).with_parse(parse)
    }

    pub fn with_triggers(mut self, triggers: &[&str]) -> Self {
        self.triggers.extend(triggers.iter().map(|t| Trigger::new(t)));
        self
    }

    pub fn with_precedence(mut self, precedence: u16) -> Self {
        self.precedence = Some(precedence);
        self
    }

    pub fn right_associative(mut self) -> Self {
        self.associativity = Associativity::Right;
        self
    }

    pub fn with_parse(mut self, parse: ParseFn) -> Self {
        self.parse = ParseStrategy::Custom(parse);
        self
    }

    pub fn with_serialize(mut self, serialize: SerializeFn) -> Self {
        self.serialize = SerializeStrategy::Custom(serialize);
        self
    }

    pub fn precedence(&self) -> u16 {
        self.precedence.unwrap_or(DEFAULT_PRECEDENCE)
    }

    /// The head this entry produces: its own name or the alias target.
    pub fn head(&self) -> Option<&str> {
        match &self.parse {
            ParseStrategy::Alias(target) => Some(target),
            _ => self.name.as_deref(),
        }
    }

    fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.triggers.first().map(|t| t.latex.clone()))
            .unwrap_or_else(|| "<anonymous>".to_string())
    }
}

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("invalid trigger `{trigger}`")]
    InvalidTrigger {
        trigger: String,
        #[source]
        source: Box<TokenizeError>,
    },
    #[error("trigger `{0}` is empty")]
    EmptyTrigger(String),
    #[error("entry `{0}` has neither a trigger nor a name")]
    MissingTrigger(String),
    #[error("entry `{0}` produces no head: give it a name, an alias or a parse handler")]
    MissingHead(String),
    #[error("matchfix entry `{0}` has no closing trigger")]
    MissingClose(String),
}

/// A match of one trigger at a position of the token stream.
#[derive(Clone, Copy, Debug)]
pub struct TriggerMatch<'d> {
    pub entry: &'d Entry,
    pub start: usize,
    /// Index just past the last token of the trigger.
    pub end: usize,
}

impl TriggerMatch<'_> {
    pub fn consumed(&self) -> usize {
        self.end - self.start
    }
}

/// Indexed table of entries, immutable once built.
#[derive(Debug)]
pub struct Dictionary {
    entries: Vec<Entry>,
    /// First token of a trigger to `(entry, trigger)` indices, in
    /// registration order.
    by_first_token: HashMap<Token, Vec<(usize, usize)>>,
    environments: HashMap<String, usize>,
    closers: HashSet<Token>,
    by_name: HashMap<String, usize>,
}

impl Default for Dictionary {
    /// The standard notations.
    fn default() -> Self {
        Self::new(definitions::standard_entries())
            .expect("standard dictionary entries are well formed")
    }
}

impl Dictionary {
    pub fn new(mut entries: Vec<Entry>) -> Result<Self, DictionaryError> {
        let mut by_first_token: HashMap<Token, Vec<(usize, usize)>> = HashMap::new();
        let mut environments = HashMap::new();
        let mut closers = HashSet::new();
        let mut by_name = HashMap::new();

        for (index, entry) in entries.iter_mut().enumerate() {
            if entry.triggers.is_empty() && entry.name.is_none() {
                return Err(DictionaryError::MissingTrigger(entry.label()));
            }
            if entry.head().is_none() && !matches!(entry.parse, ParseStrategy::Custom(_)) {
                return Err(DictionaryError::MissingHead(entry.label()));
            }

            if entry.kind == Kind::Environment {
                for trigger in &entry.triggers {
                    environments.entry(trigger.latex.clone()).or_insert(index);
                }
            } else {
                for (position, trigger) in entry.triggers.iter_mut().enumerate() {
                    trigger.tokens = tokenize_trigger(&trigger.latex)?;
                    by_first_token
                        .entry(trigger.tokens[0].clone())
                        .or_default()
                        .push((index, position));
                }
            }

            if entry.kind == Kind::Matchfix {
                let Some(close) = entry.close.as_mut() else {
                    return Err(DictionaryError::MissingClose(entry.label()));
                };
                close.tokens = tokenize_trigger(&close.latex)?;
                closers.insert(close.tokens[0].clone());
            }

            if let Some(name) = &entry.name {
                by_name.entry(name.clone()).or_insert(index);
            }
        }

        tracing::debug!(
            entries = entries.len(),
            triggers = by_first_token.values().map(Vec::len).sum::<usize>(),
            "latex dictionary built"
        );

        Ok(Self {
            entries,
            by_first_token,
            environments,
            closers,
            by_name,
        })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Every entry of one of `kinds` whose trigger matches at `position`,
    /// longest match first, then in registration order.
    pub fn candidates(&self, tokens: &[Token], position: usize, kinds: &[Kind]) -> Vec<TriggerMatch<'_>> {
        let Some(first) = tokens.get(position) else {
            return Vec::new();
        };
        let Some(indices) = self.by_first_token.get(first) else {
            return Vec::new();
        };
        let mut matches: Vec<_> = indices
            .iter()
            .filter_map(|&(index, trigger)| {
                let entry = &self.entries[index];
                if !kinds.contains(&entry.kind) {
                    return None;
                }
                let end = match_tokens(tokens, position, &entry.triggers[trigger].tokens)?;
                Some(TriggerMatch {
                    entry,
                    start: position,
                    end,
                })
            })
            .collect();
        // Stable, so registration order breaks ties.
        matches.sort_by(|a, b| b.consumed().cmp(&a.consumed()));
        matches
    }

    /// The longest match at `position`.
    pub fn lookup(&self, tokens: &[Token], position: usize, kinds: &[Kind]) -> Option<TriggerMatch<'_>> {
        self.candidates(tokens, position, kinds).into_iter().next()
    }

    pub fn environment(&self, name: &str) -> Option<&Entry> {
        self.environments.get(name).map(|&index| &self.entries[index])
    }

    /// The first entry registered under the canonical `name`. Aliases are
    /// never returned.
    pub fn by_name(&self, name: &str) -> Option<&Entry> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    /// True if `token` starts the closing trigger of some matchfix entry.
    pub fn is_closer(&self, token: &Token) -> bool {
        self.closers.contains(token)
    }
}

fn tokenize_trigger(latex: &str) -> Result<Vec<Token>, DictionaryError> {
    let tokens: Vec<_> = tokenize(latex)
        .map_err(|source| DictionaryError::InvalidTrigger {
            trigger: latex.to_string(),
            source: Box::new(source),
        })?
        .into_iter()
        .filter(|t| !t.is_space())
        .collect();
    if tokens.is_empty() {
        return Err(DictionaryError::EmptyTrigger(latex.to_string()));
    }
    Ok(tokens)
}

/// Match `pattern` against `tokens` starting at `position`, skipping spaces
/// between pattern tokens. Returns the index just past the match.
pub fn match_tokens(tokens: &[Token], position: usize, pattern: &[Token]) -> Option<usize> {
    let mut index = position;
    for (i, expected) in pattern.iter().enumerate() {
        if i > 0 {
            while tokens.get(index).is_some_and(Token::is_space) {
                index += 1;
            }
        }
        if tokens.get(index) != Some(expected) {
            return None;
        }
        index += 1;
    }
    Some(index)
}
