//! Dictionary-driven LaTeX parser producing boxed (canonical, immutable)
//! expressions, with a lattice of mathematical domains to classify them.
//!
//! # Why?
//!
//! Mathematical notation is ambiguous without types: `A \times B` is a
//! Cartesian product when `A` and `B` are sets and a multiplication
//! otherwise. The parser consults the domain lattice while it parses so that
//! operators can refuse operands of the wrong kind, and another notation
//! sharing the same trigger can claim the tokens instead.
//!
//! # Example
//!
//! ```rust
//! use boxed_expr::*;
//!
//! let engine = Engine::new();
//!
//! let product = engine.parse("\\R\\times\\Z");
//! assert_eq!(product.to_string(), r#"["CartesianProduct","RealNumber","Integer"]"#);
//!
//! let multiply = engine.parse("x\\times y");
//! assert_eq!(multiply.to_string(), r#"["Multiply","x","y"]"#);
//!
//! let set = engine.parse("\\lbrace a, b\\rbrace");
//! assert_eq!(engine.serialize(&set), "\\left\\lbrace a ,b ,\\right\\rbrace");
//!
//! assert!(engine.is_subdomain(&DomainLiteral::Integers.into(), &DomainLiteral::RealNumbers.into()));
//! ```

mod definitions;
mod definitions_sets;
mod dictionary;
mod domain;
mod engine;
mod expression;
mod flatten;
mod lattice;
mod parse;
mod serialize;
mod token;

/// Tokens are split by a [`pest`] grammar.
///
/// ```text
#[doc = include_str!("grammar.pest")]
/// ```
pub mod grammar_doc {}

pub use definitions::{standard_entries, SEQUENCE_PRECEDENCE};
pub use definitions_sets::{serialize_set, CARTESIAN_PRODUCT_PRECEDENCE};
pub use dictionary::*;
pub use domain::*;
pub use engine::*;
pub use expression::*;
pub use flatten::*;
pub use lattice::*;
pub use parse::*;
pub use serialize::*;
pub use token::{join_latex, tokenize, tokens_to_latex, Token, TokenizeError};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(latex: &str) -> String {
        Engine::new().parse(latex).to_string()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(parse("a+b*c"), r#"["Add","a",["Multiply","b","c"]]"#);
        assert_eq!(parse("a+b\\times c"), r#"["Add","a",["Multiply","b","c"]]"#);
        assert_eq!(parse("a+2b"), r#"["Add","a",["Multiply",2,"b"]]"#);
    }

    #[test]
    fn times_between_sets_is_a_right_associative_product() {
        assert_eq!(
            parse("\\R\\times\\Z\\times\\Q"),
            r#"["CartesianProduct","RealNumber",["CartesianProduct","Integer","RationalNumber"]]"#
        );
        assert_eq!(parse("x\\times y"), r#"["Multiply","x","y"]"#);
    }

    #[test]
    fn literal_mappings() {
        assert_eq!(parse("\\R^+"), r#""PositiveNumber""#);
        assert_eq!(parse("\\Z^-"), r#""NegativeInteger""#);
        assert_eq!(parse("\\N"), r#""NonNegativeInteger""#);
        assert_eq!(parse("\\mathbb{R}"), r#""RealNumber""#);
        assert_eq!(parse("\\emptyset"), r#""EmptySet""#);
        assert_eq!(parse("\\varnothing"), r#""EmptySet""#);
        assert_eq!(parse("\\R-\\bar\\Q"), r#""TranscendentalNumber""#);
    }

    #[test]
    fn aliases_converge_on_the_canonical_head() {
        assert_eq!(parse("A\\subsetneq B"), r#"["Subset","A","B"]"#);
        assert_eq!(parse("A\\varsubsetneqq B"), r#"["Subset","A","B"]"#);
    }

    #[test]
    fn set_round_trip() {
        let engine = Engine::new();
        let set = engine.parse("\\left\\lbrace a ,b ,\\right\\rbrace");
        assert_eq!(set.to_string(), r#"["Set","a","b"]"#);
        assert_eq!(engine.serialize(&set), "\\left\\lbrace a ,b ,\\right\\rbrace");

        let empty = Expression::function("Set", vec![]);
        assert_eq!(engine.serialize_set_like(&empty).as_deref(), Some("\\emptyset"));
        assert_eq!(engine.parse("\\emptyset").to_string(), r#""EmptySet""#);
    }

    #[test]
    fn unknown_environment_snapshot() {
        assert_eq!(
            parse("\\begin{pmatrix} a & b \\\\ c & d \\end{pmatrix}"),
            r#"["Error",["ErrorCode","'unknown-environment'","'pmatrix'"],["LatexString","'\\begin{pmatrix} a & b \\\\ c & d \\end{pmatrix}'"]]"#
        );
        assert_eq!(
            parse("\\begin{pmatrix}[ll] a & b \\\\ c & d \\end{pmatrix}"),
            r#"["Error",["ErrorCode","'unknown-environment'","'pmatrix'"],["LatexString","'\\begin{pmatrix}[ll] a & b \\\\ c & d \\end{pmatrix}'"]]"#
        );
    }

    #[test]
    fn unknown_left_delimiter_snapshot() {
        let expected = r#"["Error","'unexpected-delimiter'",["LatexString","'\\left\\langle'"]]"#;
        assert_eq!(
            parse("\\left\\langle\\begin{matrix} a & b \\\\ c & d \\end{matrix}\\right\\rangle"),
            expected
        );
        assert_eq!(
            parse("\\left\\langle\\begin{array}{cc} a & b \\\\ c & d \\end{array}\\right\\rangle"),
            expected
        );
    }

    #[test]
    fn errors_are_embedded_and_parsing_continues() {
        let engine = Engine::new();
        let expr = engine.parse("a+b+\\foo");
        assert!(!expr.is_valid());
        assert_eq!(expr.head_name(), Some("Add"));
        assert_eq!(expr.nops(), 3);
        assert_eq!(expr.op(2).and_then(Expression::error_code), Some("unexpected-command"));

        // The invalid inner sum is not spliced into the outer one.
        let expr = engine.parse("a+\\foo+b");
        assert_eq!(expr.nops(), 2);
        assert_eq!(expr.op(1), Some(&Expression::symbol("b")));
    }

    #[test]
    fn invalid_operands_are_not_flattened() {
        let engine = Engine::new();
        let inner = Expression::function(
            "Add",
            vec![Expression::symbol("b"), Expression::error(ErrorCode::Missing, None, None)],
        );
        let sum = engine.function("Add", vec![Expression::symbol("a"), inner.clone()]);
        assert_eq!(sum.nops(), 2);
        assert!(Expression::ptr_eq(&sum.ops()[1], &inner));
    }

    #[test]
    fn engine_is_shared_between_threads() {
        let engine = Engine::new();
        let inputs = ["\\R\\times\\Z", "x\\times y", "a+b"];
        let expected: Vec<_> = inputs.iter().map(|latex| engine.parse(latex)).collect();
        let engine = &engine;
        std::thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .iter()
                .map(|latex| scope.spawn(move || engine.parse(latex)))
                .collect();
            for (handle, expected) in handles.into_iter().zip(&expected) {
                assert_eq!(&handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn domain_queries_by_name() {
        let engine = Engine::new();
        assert_eq!(engine.lattice().is_subdomain_of("Integers", "Numbers"), Ok(true));
        assert!(is_domain_literal("ExtendedRealNumbers"));
        assert!(!is_domain_literal("Reals"));
        let ancestors = engine.ancestors(&DomainLiteral::Integers.into());
        assert_eq!(
            ancestors[..3],
            [
                DomainLiteral::RationalNumbers,
                DomainLiteral::AlgebraicNumbers,
                DomainLiteral::RealNumbers,
            ]
        );
    }
}
