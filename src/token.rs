use std::fmt;

use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar.pest"] // relative to project `src`
struct LatexTokenizer;

pub type TokenizeError = pest::error::Error<Rule>;

/// One atomic unit of LaTeX source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// A command, including its leading backslash: `\frac`, `\{`, `\\`.
    Command(String),
    /// `{`
    GroupStart,
    /// `}`
    GroupEnd,
    /// Any other single character: letters, digits, punctuation.
    Char(char),
    /// A run of whitespace.
    Space,
}

impl Token {
    pub fn command(name: &str) -> Self {
        Self::Command(name.to_string())
    }

    pub fn is_space(&self) -> bool {
        matches!(self, Self::Space)
    }

    pub fn is_command(&self, name: &str) -> bool {
        matches!(self, Self::Command(c) if c == name)
    }

    pub fn is_char(&self, ch: char) -> bool {
        matches!(self, Self::Char(c) if *c == ch)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(c) => f.write_str(c),
            Self::GroupStart => f.write_str("{"),
            Self::GroupEnd => f.write_str("}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Space => f.write_str(" "),
        }
    }
}

/// Split LaTeX source into tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokens = Vec::new();
    for pair in LatexTokenizer::parse(Rule::tokens, input)?.flatten() {
        let token = match pair.as_rule() {
            Rule::command => Token::Command(pair.as_str().to_string()),
            Rule::group_start => Token::GroupStart,
            Rule::group_end => Token::GroupEnd,
            Rule::space => Token::Space,
            Rule::character => match pair.as_str().chars().next() {
                Some(c) => Token::Char(c),
                None => continue,
            },
            _ => continue,
        };
        tokens.push(token);
    }
    Ok(tokens)
}

/// Concatenate LaTeX fragments, inserting a space only where a trailing
/// command would otherwise absorb the letters of the next fragment.
pub fn join_latex<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = String::new();
    for fragment in fragments {
        let fragment = fragment.as_ref();
        if fragment.is_empty() {
            continue;
        }
        let starts_with_letter = fragment
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic());
        if starts_with_letter && ends_with_command(&result) {
            result.push(' ');
        }
        result.push_str(fragment);
    }
    result
}

/// Reproduce the source text of a token slice.
pub fn tokens_to_latex(tokens: &[Token]) -> String {
    join_latex(tokens.iter().map(|t| t.to_string()))
}

fn ends_with_command(latex: &str) -> bool {
    let trimmed = latex.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    trimmed.len() < latex.len() && trimmed.ends_with('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_commands_and_groups() {
        let tokens = tokenize("\\R^{+}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::command("\\R"),
                Token::Char('^'),
                Token::GroupStart,
                Token::Char('+'),
                Token::GroupEnd,
            ]
        );
    }

    #[test]
    fn tokenize_escaped_characters_and_spaces() {
        let tokens = tokenize("\\{ a \\\\ b\\}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::command("\\{"),
                Token::Space,
                Token::Char('a'),
                Token::Space,
                Token::command("\\\\"),
                Token::Space,
                Token::Char('b'),
                Token::command("\\}"),
            ]
        );
    }

    #[test]
    fn comments_are_dropped() {
        let tokens = tokenize("a % note\nb").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Char('a'), Token::Space, Token::Char('b')]
        );
    }

    #[test]
    fn command_letters_stop_at_digits() {
        let tokens = tokenize("\\gt0").unwrap();
        assert_eq!(tokens, vec![Token::command("\\gt"), Token::Char('0')]);
    }

    #[test]
    fn join_separates_command_from_letter() {
        assert_eq!(
            join_latex(["\\left\\lbrace", "a ,", "b ,", "\\right\\rbrace"]),
            "\\left\\lbrace a ,b ,\\right\\rbrace"
        );
        assert_eq!(join_latex(["\\mathopen\\lbrack", "1", ", ", "x"]), "\\mathopen\\lbrack1, x");
        assert_eq!(join_latex(["\\\\", "a"]), "\\\\a");
    }

    #[test]
    fn tokens_round_trip_to_source() {
        let source = "\\begin{pmatrix} a & b \\\\ c & d \\end{pmatrix}";
        assert_eq!(tokens_to_latex(&tokenize(source).unwrap()), source);
    }
}
