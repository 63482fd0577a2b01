//! Set constants, set operators and set relations.

use crate::dictionary::{Entry, Kind};
use crate::domain::DomainLiteral;
use crate::engine::FunctionDefinition;
use crate::expression::Expression;
use crate::parse::{Parser, Terminator};
use crate::serialize::Serializer;
use crate::token::join_latex;

pub const CARTESIAN_PRODUCT_PRECEDENCE: u16 = 390;
const REVERSE_ELEMENT_PRECEDENCE: u16 = 160;
const CONDITION_PRECEDENCE: u16 = 21;

const SET_CONSTANTS: &[&str] = &[
    "AlgebraicNumber",
    "ComplexNumber",
    "ImaginaryNumber",
    "ExtendedComplexNumber",
    "EmptySet",
    "Integer",
    "RationalNumber",
    "RealNumber",
    "ExtendedRealNumber",
    "TranscendentalNumber",
    "NegativeNumber",
    "PositiveNumber",
    "NonPositiveNumber",
    "NegativeInteger",
    "PositiveInteger",
    "NonNegativeInteger",
];

pub fn entries() -> Vec<Entry> {
    let relation = |name: &str, trigger: &str| Entry::infix(name, trigger, 240).right_associative();
    let square = |name: &str, trigger: &str| Entry::infix(name, trigger, 265).right_associative();

    vec![
        // Constants
        Entry::symbol("AlgebraicNumber", "\\bar\\Q"),
        Entry::symbol("ComplexNumber", "\\C"),
        Entry::alias(Kind::Symbol, "ComplexNumber", &["\\mathbb{C}"]),
        Entry::symbol("ImaginaryNumber", "\\imaginaryI\\R"),
        Entry::symbol("ExtendedComplexNumber", "\\bar\\C"),
        Entry::symbol("EmptySet", "\\emptyset"),
        Entry::alias(Kind::Symbol, "EmptySet", &["\\varnothing"]),
        Entry::symbol("Integer", "\\Z"),
        Entry::alias(Kind::Symbol, "Integer", &["\\mathbb{Z}"]),
        Entry::symbol("RationalNumber", "\\Q"),
        Entry::alias(Kind::Symbol, "RationalNumber", &["\\mathbb{Q}"]),
        Entry::symbol("RealNumber", "\\R"),
        Entry::alias(Kind::Symbol, "RealNumber", &["\\mathbb{R}"]),
        Entry::symbol("ExtendedRealNumber", "\\bar\\R"),
        Entry::symbol("TranscendentalNumber", "\\R-\\bar\\Q"),
        Entry::alias(Kind::Symbol, "TranscendentalNumber", &["\\R\\backslash\\bar\\Q"]),
        // Real numbers < 0
        Entry::symbol("NegativeNumber", "\\R^-"),
        Entry::alias(
            Kind::Symbol,
            "NegativeNumber",
            &["\\R^{-}", "\\R_-", "\\R_{-}", "\\R^{\\lt}"],
        ),
        // Real numbers > 0
        Entry::symbol("PositiveNumber", "\\R^+"),
        Entry::alias(
            Kind::Symbol,
            "PositiveNumber",
            &["\\R^{+}", "\\R_+", "\\R_{+}", "\\R^{\\gt}"],
        ),
        // Real numbers <= 0
        Entry::symbol("NonPositiveNumber", "\\R^{0-}"),
        Entry::alias(Kind::Symbol, "NonPositiveNumber", &["\\R^{-0}", "\\R^{\\leq}"]),
        // Integers < 0
        Entry::symbol("NegativeInteger", "\\Z^-"),
        Entry::alias(
            Kind::Symbol,
            "NegativeInteger",
            &["\\Z^{-}", "\\Z_-", "\\Z_{-}", "\\Z^{\\lt}"],
        ),
        // Integers > 0
        Entry::symbol("PositiveInteger", "\\Z^+"),
        Entry::alias(
            Kind::Symbol,
            "PositiveInteger",
            &[
                "\\Z^{+}",
                "\\Z_+",
                "\\Z_{+}",
                "\\Z^{\\gt}",
                "\\Z^{\\gt0}",
                "\\N^+",
                "\\N^{+}",
                "\\N^*",
                "\\N^{*}",
                "\\N^\\star",
                "\\N^{\\star}",
                "\\N_1",
                "\\N_{1}",
            ],
        ),
        // Integers >= 0
        Entry::symbol("NonNegativeInteger", "\\N"),
        Entry::alias(
            Kind::Symbol,
            "NonNegativeInteger",
            &[
                "\\Z^{+0}",
                "\\Z^{\\geq}",
                "\\Z^{\\geq0}",
                "\\Z^{0+}",
                "\\mathbb{N}",
                "\\N_0",
                "\\N_{0}",
            ],
        ),
        // Set expressions
        Entry::infix("CartesianProduct", "\\times", CARTESIAN_PRODUCT_PRECEDENCE)
            .right_associative()
            .with_parse(parse_cartesian_product),
        Entry::alias(Kind::Postfix, "Complement", &["^\\complement"]),
        Entry::postfix("Complement", "^{\\complement}"),
        Entry::infix("Intersection", "\\cap", 350),
        Entry::infix("Union", "\\cup", 350),
        Entry::infix("SetMinus", "\\setminus", 650),
        Entry::infix("SymmetricDifference", "\\triangle", 260),
        Entry::serialize_only("Interval", serialize_set),
        Entry::serialize_only("Range", serialize_set),
        Entry::matchfix("Set", "\\lbrace", "\\rbrace").with_serialize(serialize_set),
        Entry::matchfix("Set", "\\{", "\\}"),
        Entry::matchfix("Set", "\\left\\lbrace", "\\right\\rbrace"),
        Entry::matchfix("Set", "\\left\\{", "\\right\\}"),
        Entry::custom(Kind::Infix, "\\mid", parse_condition)
            .with_triggers(&["\\middle\\mid"])
            .with_precedence(CONDITION_PRECEDENCE),
        // Predicates and relations
        Entry::custom(Kind::Infix, "\\ni", parse_reverse_element)
            .right_associative()
            .with_precedence(REVERSE_ELEMENT_PRECEDENCE),
        Entry::infix("Element", "\\in", 240),
        Entry::infix("NotElement", "\\notin", 240),
        relation("NotSubset", "\\nsubset"),
        relation("NotSuperset", "\\nsupset"),
        relation("NotSubsetNotEqual", "\\nsubseteq"),
        relation("NotSupersetNotEqual", "\\nsupseteq"),
        square("SquareSubset", "\\sqsubset"),
        square("SquareSubsetEqual", "\\sqsubseteq"),
        square("SquareSuperset", "\\sqsupset"),
        square("SquareSupersetEqual", "\\sqsupseteq"),
        relation("Subset", "\\subset"),
        Entry::alias(Kind::Infix, "Subset", &["\\subsetneq", "\\varsubsetneqq"])
            .with_precedence(240)
            .right_associative(),
        Entry::infix("SubsetEqual", "\\subseteq", 240),
        relation("Superset", "\\supset"),
        Entry::alias(Kind::Infix, "Superset", &["\\supsetneq", "\\varsupsetneq"])
            .with_precedence(240)
            .right_associative(),
        relation("SupersetEqual", "\\supseteq"),
    ]
}

/// Set constants and the names of domain literals denote sets.
pub fn symbols() -> Vec<(&'static str, DomainLiteral)> {
    SET_CONSTANTS
        .iter()
        .copied()
        .chain(
            DomainLiteral::ALL
                .iter()
                .filter(|&&d| d != DomainLiteral::Nothing)
                .map(|d| d.name()),
        )
        .map(|name| (name, DomainLiteral::Sets))
        .collect()
}

pub fn functions() -> Vec<(&'static str, FunctionDefinition)> {
    use DomainLiteral::{Booleans, Sets};

    let mut functions = vec![
        ("Union", FunctionDefinition::associative(Sets)),
        ("Intersection", FunctionDefinition::associative(Sets)),
    ];
    functions.extend(
        [
            "SetMinus",
            "Complement",
            "SymmetricDifference",
            "CartesianProduct",
            "Set",
            "Range",
            "Interval",
        ]
        .map(|name| (name, FunctionDefinition::new(Sets))),
    );
    functions.extend(
        [
            "Element",
            "NotElement",
            "Subset",
            "SubsetEqual",
            "Superset",
            "SupersetEqual",
            "NotSubset",
            "NotSuperset",
            "NotSubsetNotEqual",
            "NotSupersetNotEqual",
            "SquareSubset",
            "SquareSubsetEqual",
            "SquareSuperset",
            "SquareSupersetEqual",
        ]
        .map(|name| (name, FunctionDefinition::new(Booleans))),
    );
    functions
}

/// `\times` is a Cartesian product only between sets. Otherwise the match
/// is rejected and `Multiply` gets the trigger.
fn parse_cartesian_product(
    parser: &mut Parser<'_>,
    lhs: Option<&Expression>,
    until: &Terminator<'_>,
) -> Option<Expression> {
    let lhs = lhs?;
    if !parser.is_compatible(lhs, DomainLiteral::Sets) {
        return None;
    }
    let rhs = parser.parse_expression(&until.with_min_prec(CARTESIAN_PRODUCT_PRECEDENCE))?;
    if !parser.is_compatible(&rhs, DomainLiteral::Sets) {
        return None;
    }
    Some(parser.function("CartesianProduct", vec![lhs.clone(), rhs]))
}

/// `A \ni x` is `Element(x, A)`.
fn parse_reverse_element(
    parser: &mut Parser<'_>,
    lhs: Option<&Expression>,
    until: &Terminator<'_>,
) -> Option<Expression> {
    let lhs = lhs?.clone();
    let rhs = parser.parse_expression(&until.with_min_prec(REVERSE_ELEMENT_PRECEDENCE))?;
    Some(parser.function("Element", vec![rhs, lhs]))
}

/// Set-builder condition: `x \mid p` inside a set is `x, Condition(p)`.
fn parse_condition(
    parser: &mut Parser<'_>,
    lhs: Option<&Expression>,
    until: &Terminator<'_>,
) -> Option<Expression> {
    let lhs = lhs?.clone();
    let condition = parser.parse_expression(&until.with_min_prec(CONDITION_PRECEDENCE + 1))?;
    let condition = parser.function("Condition", vec![condition]);
    Some(parser.function("Sequence", vec![lhs, condition]))
}

/// LaTeX for `Set`, `Range` and `Interval`. Other heads serialize to an
/// empty string.
pub fn serialize_set(serializer: &Serializer<'_>, expr: &Expression) -> String {
    let operand = |index: usize| {
        expr.op(index)
            .map(|op| serializer.serialize(op))
            .unwrap_or_default()
    };

    match expr.head_name() {
        Some("Set") => {
            if expr.nops() == 0 {
                return "\\emptyset".to_string();
            }
            if let (2, Some(condition)) = (expr.nops(), expr.op(1)) {
                if condition.head_name() == Some("Condition") {
                    let predicate = condition
                        .op(0)
                        .map(|p| serializer.serialize(p))
                        .unwrap_or_default();
                    return join_latex([
                        "\\left\\lbrace".to_string(),
                        operand(0),
                        "\\middle\\mid".to_string(),
                        predicate,
                        "\\right\\rbrace".to_string(),
                    ]);
                }
            }
            let elements = expr.ops().iter().map(|op| format!("{} ,", serializer.serialize(op)));
            join_latex(
                std::iter::once("\\left\\lbrace".to_string())
                    .chain(elements)
                    .chain(std::iter::once("\\right\\rbrace".to_string())),
            )
        }
        Some("Range") => join_latex([
            "\\mathopen\\lbrack".to_string(),
            operand(0),
            ", ".to_string(),
            operand(1),
            "\\mathclose\\rbrack".to_string(),
        ]),
        Some("Interval") => {
            let (low, open_low) = open_endpoint(expr.op(0));
            let (high, open_high) = open_endpoint(expr.op(1));
            let endpoint = |op: Option<&Expression>| {
                op.map(|op| serializer.serialize(op)).unwrap_or_default()
            };
            join_latex([
                format!("\\mathopen{}", if open_low { "\\rbrack" } else { "\\lbrack" }),
                endpoint(low),
                ", ".to_string(),
                endpoint(high),
                format!("\\mathclose{}", if open_high { "\\lbrack" } else { "\\rbrack" }),
            ])
        }
        _ => String::new(),
    }
}

/// Unwrap `Open(x)` to `x`, reporting whether it was open.
fn open_endpoint(op: Option<&Expression>) -> (Option<&Expression>, bool) {
    match op {
        Some(op) if op.head_name() == Some("Open") => (op.op(0), true),
        other => (other, false),
    }
}
