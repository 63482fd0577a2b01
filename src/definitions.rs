//! Arithmetic, relations and grouping notations.

use crate::definitions_sets;
use crate::dictionary::Entry;
use crate::domain::DomainLiteral;
use crate::engine::FunctionDefinition;
use crate::expression::Expression;
use crate::parse::{Parser, Terminator};
use crate::serialize::Serializer;
use crate::token::join_latex;

pub const SEQUENCE_PRECEDENCE: u16 = 20;

/// Every standard notation. Set notations come first, so a `\times`
/// between sets is tried as a Cartesian product before `Multiply`.
pub fn standard_entries() -> Vec<Entry> {
    let mut entries = definitions_sets::entries();
    entries.extend(self::entries());
    entries
}

pub fn entries() -> Vec<Entry> {
    vec![
        Entry::infix("Add", "+", 275),
        Entry::infix("Subtract", "-", 275),
        Entry::prefix("Negate", "-", 275),
        // `\cdot` first: `\times` between sets reads back as a product of sets.
        Entry::infix("Multiply", "\\cdot", 390).with_triggers(&["\\times", "*"]),
        Entry::infix("Divide", "/", 660).with_triggers(&["\\div"]),
        Entry::infix("Power", "^", 720).right_associative(),
        Entry::infix("Subscript", "_", 720).right_associative(),
        Entry::infix("Equal", "=", 260),
        Entry::infix("NotEqual", "\\ne", 255).with_triggers(&["\\neq"]),
        Entry::infix("Less", "<", 245).with_triggers(&["\\lt"]),
        Entry::infix("LessEqual", "\\le", 241).with_triggers(&["\\leq"]),
        Entry::infix("Greater", ">", 245).with_triggers(&["\\gt"]),
        Entry::infix("GreaterEqual", "\\ge", 242).with_triggers(&["\\geq"]),
        Entry::infix("Sequence", ",", SEQUENCE_PRECEDENCE).with_parse(parse_sequence),
        Entry::symbol("Pi", "\\pi"),
        Entry::symbol("PositiveInfinity", "\\infty"),
        Entry::matchfix("Delimiter", "(", ")"),
        Entry::matchfix("Delimiter", "\\left(", "\\right)"),
        Entry::matchfix("List", "\\lbrack", "\\rbrack"),
        Entry::matchfix("List", "\\left\\lbrack", "\\right\\rbrack"),
        Entry::environment("Matrix", "matrix").with_serialize(serialize_matrix),
    ]
}

pub fn symbols() -> Vec<(&'static str, DomainLiteral)> {
    vec![
        ("Pi", DomainLiteral::TranscendentalNumbers),
        ("PositiveInfinity", DomainLiteral::ExtendedRealNumbers),
        ("Nothing", DomainLiteral::Nothing),
        ("True", DomainLiteral::Booleans),
        ("False", DomainLiteral::Booleans),
    ]
}

pub fn functions() -> Vec<(&'static str, FunctionDefinition)> {
    use DomainLiteral::*;

    vec![
        ("Add", FunctionDefinition::associative(Numbers)),
        ("Multiply", FunctionDefinition::associative(Numbers)),
        ("Subtract", FunctionDefinition::new(Numbers)),
        ("Negate", FunctionDefinition::new(Numbers)),
        ("Divide", FunctionDefinition::new(Numbers)),
        ("Power", FunctionDefinition::new(Numbers)),
        ("Equal", FunctionDefinition::new(Booleans)),
        ("NotEqual", FunctionDefinition::new(Booleans)),
        ("Less", FunctionDefinition::new(Booleans)),
        ("LessEqual", FunctionDefinition::new(Booleans)),
        ("Greater", FunctionDefinition::new(Booleans)),
        ("GreaterEqual", FunctionDefinition::new(Booleans)),
        ("Sequence", FunctionDefinition::associative(Sequences)),
        ("List", FunctionDefinition::new(Lists)),
        ("Matrix", FunctionDefinition::new(Lists)),
        ("Tuple", FunctionDefinition::new(Tuples)),
        ("Error", FunctionDefinition::new(Void)),
    ]
}

/// `a, b` with a tolerated trailing comma: `a,` is `Sequence(a)`.
///
/// A comma after a sequence adds to it, even when an element is an error,
/// so every element stays a sibling.
fn parse_sequence(
    parser: &mut Parser<'_>,
    lhs: Option<&Expression>,
    until: &Terminator<'_>,
) -> Option<Expression> {
    let lhs = lhs?;
    let mut ops = match lhs.head_name() {
        Some("Sequence") => lhs.ops().to_vec(),
        _ => vec![lhs.clone()],
    };
    ops.extend(parser.parse_expression(&until.with_min_prec(SEQUENCE_PRECEDENCE + 1)));
    Some(parser.function("Sequence", ops))
}

/// `Matrix(List(List(a, b), List(c, d)))` as a `matrix` environment.
fn serialize_matrix(serializer: &Serializer<'_>, expr: &Expression) -> String {
    let rows: Vec<_> = expr
        .op(0)
        .map(Expression::ops)
        .unwrap_or_default()
        .iter()
        .map(|row| {
            let cells: Vec<_> = row
                .ops()
                .iter()
                .map(|cell| match cell.symbol_name() {
                    Some("Nothing") => String::new(),
                    _ => serializer.serialize(cell),
                })
                .collect();
            cells.join(" & ")
        })
        .collect();
    join_latex([
        "\\begin{matrix}".to_string(),
        rows.join("\\\\ "),
        "\\end{matrix}".to_string(),
    ])
}
