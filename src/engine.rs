use std::borrow::Cow;
use std::collections::HashMap;

#[cfg(feature = "rayon")]
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

use num_traits::{Float, Signed};

use crate::definitions;
use crate::definitions_sets;
use crate::dictionary::Dictionary;
use crate::domain::{Domain, DomainLiteral};
use crate::expression::{ErrorCode, Expression, Number};
use crate::flatten::{flatten_ops, flatten_sequence};
use crate::lattice::DomainLattice;
use crate::parse::{Parser, ParserOptions};
use crate::serialize::Serializer;
use crate::token::{tokenize, Token};

/// What the engine knows about a function head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FunctionDefinition {
    /// Domain of the values the function produces.
    pub domain: DomainLiteral,
    /// `f(a, f(b, c))` is `f(a, b, c)`.
    pub associative: bool,
}

impl FunctionDefinition {
    pub fn new(domain: DomainLiteral) -> Self {
        Self {
            domain,
            associative: false,
        }
    }

    pub fn associative(domain: DomainLiteral) -> Self {
        Self {
            domain,
            associative: true,
        }
    }
}

/// Parsing context: the dictionary, the domain lattice, the parser options
/// and the domains of known symbols and functions.
///
/// An engine is immutable while parsing and can be shared between threads.
#[derive(Debug)]
pub struct Engine {
    dictionary: Dictionary,
    lattice: DomainLattice,
    options: ParserOptions,
    symbols: HashMap<String, DomainLiteral>,
    functions: HashMap<String, FunctionDefinition>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_dictionary(Dictionary::default(), ParserOptions::default())
    }

    pub fn with_dictionary(dictionary: Dictionary, options: ParserOptions) -> Self {
        let symbols = definitions_sets::symbols()
            .into_iter()
            .chain(definitions::symbols())
            .map(|(name, domain)| (name.to_string(), domain))
            .collect();
        let functions = definitions_sets::functions()
            .into_iter()
            .chain(definitions::functions())
            .map(|(name, definition)| (name.to_string(), definition))
            .collect();
        Self {
            dictionary,
            lattice: DomainLattice::new(),
            options,
            symbols,
            functions,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn lattice(&self) -> &DomainLattice {
        &self.lattice
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn declare_symbol(&mut self, name: &str, domain: DomainLiteral) {
        self.symbols.insert(name.to_string(), domain);
    }

    pub fn declare_function(&mut self, name: &str, definition: FunctionDefinition) {
        self.functions.insert(name.to_string(), definition);
    }

    /// Parse LaTeX source. Never fails: problems are embedded in the result
    /// as `Error` nodes.
    pub fn parse(&self, latex: &str) -> Expression {
        match tokenize(latex) {
            Ok(tokens) => self.parse_tokens(&tokens),
            Err(err) => {
                tracing::debug!(error = %err, "input could not be tokenized");
                Expression::error(ErrorCode::SyntaxError, None, Some(latex))
            }
        }
    }

    pub fn parse_tokens(&self, tokens: &[Token]) -> Expression {
        Parser::new(self, tokens).parse_root()
    }

    /// Parse every input, in parallel with the `rayon` feature. Results are
    /// in input order.
    pub fn parse_all<S>(&self, inputs: &[S]) -> Vec<Expression>
    where
        S: AsRef<str> + Sync,
    {
        #[cfg(feature = "rayon")]
        let inputs = inputs.par_iter();
        #[cfg(not(feature = "rayon"))]
        let inputs = inputs.iter();

        inputs.map(|latex| self.parse(latex.as_ref())).collect()
    }

    /// A function call with its operands normalized: sequences and
    /// delimiters are spliced in, and calls to an associative head are
    /// flattened. `Delimiter` calls are kept as written.
    pub fn function(&self, head: &str, ops: Vec<Expression>) -> Expression {
        if head == "Delimiter" {
            return Expression::function(head, ops);
        }
        let ops = normalized(ops, flatten_sequence);
        let ops = if self.is_associative(head) {
            normalized(ops, |ops| flatten_ops(ops, head))
        } else {
            ops
        };
        Expression::function(head, ops)
    }

    pub fn is_associative(&self, head: &str) -> bool {
        self.functions.get(head).is_some_and(|f| f.associative)
    }

    /// The domain of `expr`. The domain of a function call other than a
    /// `Delimiter` is computed once and then cached in the expression, so
    /// the first engine to ask decides it.
    pub fn domain(&self, expr: &Expression) -> Domain {
        match expr {
            Expression::Number(n) => number_domain(*n).into(),
            Expression::String(_) => DomainLiteral::Strings.into(),
            Expression::Symbol(name) => self
                .symbols
                .get(name.as_ref())
                .copied()
                .unwrap_or(DomainLiteral::Anything)
                .into(),
            // A group takes the domain of its content, which can change
            // with `declare_symbol`, so it is not cached.
            Expression::Function(_) if expr.head_name() == Some("Delimiter") => {
                self.function_domain(expr)
            }
            Expression::Function(_) => match expr.domain_cell() {
                Some(cell) => cell.get_or_init(|| self.function_domain(expr)).clone(),
                None => self.function_domain(expr),
            },
        }
    }

    fn function_domain(&self, expr: &Expression) -> Domain {
        match expr.head_name() {
            Some("Delimiter") => match expr.ops() {
                [single] => self.domain(single),
                _ => DomainLiteral::Tuples.into(),
            },
            Some(name) => self
                .functions
                .get(name)
                .map_or(DomainLiteral::Anything, |f| f.domain)
                .into(),
            None => DomainLiteral::Anything.into(),
        }
    }

    /// True if the domain of `expr` is a subdomain of `domain`.
    pub fn is_compatible(&self, expr: &Expression, domain: &Domain) -> bool {
        self.lattice.is_subdomain(&self.domain(expr), domain)
    }

    pub fn ancestors(&self, domain: &Domain) -> Vec<DomainLiteral> {
        self.lattice.ancestors(domain)
    }

    pub fn is_subdomain(&self, lhs: &Domain, rhs: &Domain) -> bool {
        self.lattice.is_subdomain(lhs, rhs)
    }

    pub fn serializer(&self) -> Serializer<'_> {
        Serializer::new(&self.dictionary)
    }

    pub fn serialize(&self, expr: &Expression) -> String {
        self.serializer().serialize(expr)
    }

    /// LaTeX for `Set`, `Range` and `Interval` expressions.
    pub fn serialize_set_like(&self, expr: &Expression) -> Option<String> {
        match expr.head_name()? {
            "Set" | "Range" | "Interval" => {
                Some(definitions_sets::serialize_set(&self.serializer(), expr))
            }
            _ => None,
        }
    }
}

fn normalized<F>(ops: Vec<Expression>, pass: F) -> Vec<Expression>
where
    F: for<'o> Fn(&'o [Expression]) -> Cow<'o, [Expression]>,
{
    let flattened = match pass(&ops) {
        Cow::Owned(flat) => Some(flat),
        Cow::Borrowed(_) => None,
    };
    flattened.unwrap_or(ops)
}

fn number_domain(n: Number) -> DomainLiteral {
    match n {
        Number::Integer(value) => integer_domain(value),
        Number::Float(value) => real_domain(value),
    }
}

fn integer_domain<T: Signed>(value: T) -> DomainLiteral {
    // `is_positive` only reads the sign of a float, so zero goes first.
    if value.is_zero() {
        DomainLiteral::NonNegativeIntegers
    } else if value.is_positive() {
        DomainLiteral::PositiveIntegers
    } else if value.is_negative() {
        DomainLiteral::NegativeIntegers
    } else {
        DomainLiteral::NonNegativeIntegers
    }
}

fn real_domain<T: Float + Signed>(value: T) -> DomainLiteral {
    if value.is_nan() {
        DomainLiteral::Numbers
    } else if value.is_infinite() {
        DomainLiteral::ExtendedRealNumbers
    } else if value.fract().is_zero() {
        integer_domain(value)
    } else if Signed::is_positive(&value) {
        DomainLiteral::PositiveNumbers
    } else {
        DomainLiteral::NegativeNumbers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use DomainLiteral::*;

    fn sym(name: &str) -> Expression {
        Expression::symbol(name)
    }

    #[test]
    fn engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
        assert_send_sync::<Expression>();
    }

    #[test]
    fn number_domains() {
        let engine = Engine::new();
        let domain = |expr: Expression| engine.domain(&expr);
        assert_eq!(domain(Expression::integer(3)), PositiveIntegers.into());
        assert_eq!(domain(Expression::integer(-3)), NegativeIntegers.into());
        assert_eq!(domain(Expression::integer(0)), NonNegativeIntegers.into());
        assert_eq!(domain(Expression::float(2.0)), PositiveIntegers.into());
        assert_eq!(domain(Expression::float(-0.5)), NegativeNumbers.into());
        assert_eq!(domain(Expression::float(f64::INFINITY)), ExtendedRealNumbers.into());
        assert_eq!(domain(Expression::float(f64::NAN)), Numbers.into());
    }

    #[test]
    fn float_zero_is_not_signed() {
        let engine = Engine::new();
        for zero in [engine.parse("0.0"), Expression::float(-0.0)] {
            assert_eq!(engine.domain(&zero), NonNegativeIntegers.into());
            assert!(!engine.is_compatible(&zero, &PositiveIntegers.into()));
            assert!(!engine.is_compatible(&zero, &NegativeIntegers.into()));
        }
    }

    #[test]
    fn symbol_and_function_domains() {
        let engine = Engine::new();
        assert_eq!(engine.domain(&sym("RealNumber")), Sets.into());
        assert_eq!(engine.domain(&sym("Integers")), Sets.into());
        assert_eq!(engine.domain(&sym("Nothing")), Nothing.into());
        assert_eq!(engine.domain(&sym("x")), Anything.into());
        assert_eq!(engine.domain(&engine.parse("x\\in\\R")), Booleans.into());
        assert_eq!(engine.domain(&engine.parse("\\R\\cup\\Z")), Sets.into());
        assert_eq!(engine.domain(&engine.parse("(\\R)")), Sets.into());
        assert_eq!(engine.domain(&engine.parse("\\foo")), Void.into());
    }

    #[test]
    fn declared_symbols_take_part_in_type_gating() {
        let mut engine = Engine::new();
        assert_eq!(engine.parse("A\\times B").head_name(), Some("Multiply"));
        engine.declare_symbol("A", Sets);
        engine.declare_symbol("B", Sets);
        assert_eq!(engine.parse("A\\times B").head_name(), Some("CartesianProduct"));
    }

    #[test]
    fn function_domains_are_cached() {
        let engine = Engine::new();
        let expr = engine.parse("a+b");
        assert!(expr.domain_cell().is_some_and(|cell| cell.get().is_none()));
        assert_eq!(engine.domain(&expr), Numbers.into());
        assert!(expr.domain_cell().is_some_and(|cell| cell.get().is_some()));
    }

    #[test]
    fn group_domains_follow_declarations() {
        let mut engine = Engine::new();
        let group = engine.parse("(X)");
        assert_eq!(group.head_name(), Some("Delimiter"));
        assert_eq!(engine.domain(&group), Anything.into());
        engine.declare_symbol("X", Sets);
        assert_eq!(engine.domain(&group), Sets.into());
    }

    #[test]
    fn compatibility_goes_through_the_lattice() {
        let engine = Engine::new();
        assert!(engine.is_compatible(&Expression::integer(2), &Integers.into()));
        assert!(engine.is_compatible(&Expression::integer(2), &RealNumbers.into()));
        assert!(!engine.is_compatible(&Expression::float(0.5), &Integers.into()));
        assert!(engine.is_compatible(&sym("EmptySet"), &Collections.into()));
        assert!(engine.is_compatible(&Expression::integer(2), &Domain::maybe(Numbers.into())));
        assert!(engine.is_subdomain(&PositiveIntegers.into(), &Numbers.into()));
        assert!(engine.ancestors(&Sets.into()).contains(&Collections));
    }

    #[test]
    fn function_normalizes_operands() {
        let engine = Engine::new();
        let inner = engine.function("Add", vec![sym("b"), sym("c")]);
        let sum = engine.function("Add", vec![sym("a"), inner.clone()]);
        assert_eq!(sum.to_string(), r#"["Add","a","b","c"]"#);

        let nested = engine.function("Subtract", vec![sym("b"), sym("c")]);
        let difference = engine.function("Subtract", vec![sym("a"), nested]);
        assert_eq!(difference.nops(), 2);

        let grouped = engine.function("Delimiter", vec![inner]);
        assert_eq!(grouped.to_string(), r#"["Delimiter",["Add","b","c"]]"#);
        let empty = Expression::function("Delimiter", vec![]);
        assert_eq!(
            engine.function("f", vec![grouped, empty]).to_string(),
            r#"["f",["Add","b","c"],["Tuple"]]"#
        );
    }

    #[test]
    fn parse_all_keeps_input_order() {
        let engine = Engine::new();
        let parsed = engine.parse_all(&["a+b", "\\R", "x^2"]);
        let rendered: Vec<_> = parsed.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                r#"["Add","a","b"]"#.to_string(),
                r#""RealNumber""#.to_string(),
                r#"["Power","x",2]"#.to_string(),
            ]
        );
    }

    #[test]
    fn serialize_set_like_only_handles_sets() {
        let engine = Engine::new();
        let set = engine.parse("\\{a, b\\}");
        assert_eq!(
            engine.serialize_set_like(&set).as_deref(),
            Some("\\left\\lbrace a ,b ,\\right\\rbrace")
        );
        assert_eq!(engine.serialize_set_like(&engine.parse("a+b")), None);
        assert_eq!(engine.serialize_set_like(&sym("EmptySet")), None);
    }
}
