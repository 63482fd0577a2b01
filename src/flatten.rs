//! Normalization of operand lists.
//!
//! Both passes return [`Cow::Borrowed`] with the input slice itself when
//! there is nothing to do, so they can be applied repeatedly for free.

use std::borrow::Cow;
use std::slice;

use crate::expression::Expression;

/// Splice in the operands of every direct child whose head is `head`,
/// recursively: `["f", a, ["f", b, c]]` has the operands `a, b, c`.
///
/// Invalid children are kept as they are.
pub fn flatten_ops<'a>(ops: &'a [Expression], head: &str) -> Cow<'a, [Expression]> {
    if !ops.iter().any(|op| has_head(op, head)) {
        return Cow::Borrowed(ops);
    }
    let mut result = Vec::with_capacity(ops.len() + 1);
    push_flattened(ops, head, &mut result);
    Cow::Owned(result)
}

fn push_flattened(ops: &[Expression], head: &str, out: &mut Vec<Expression>) {
    for op in ops {
        if has_head(op, head) {
            push_flattened(op.ops(), head, out);
        } else {
            out.push(op.clone());
        }
    }
}

fn has_head(expr: &Expression, head: &str) -> bool {
    expr.is_valid() && expr.head_name() == Some(head)
}

/// Expand `Sequence` operands in place and unwrap `Delimiter` groups.
///
/// An empty delimiter, `()`, is kept as an empty `Tuple`.
pub fn flatten_sequence(ops: &[Expression]) -> Cow<'_, [Expression]> {
    if !ops.iter().any(is_grouping) {
        return Cow::Borrowed(ops);
    }
    let mut result = Vec::with_capacity(ops.len());
    push_sequence(ops, &mut result);
    Cow::Owned(result)
}

fn is_grouping(expr: &Expression) -> bool {
    expr.is_valid() && matches!(expr.head_name(), Some("Sequence" | "Delimiter"))
}

fn push_sequence(ops: &[Expression], out: &mut Vec<Expression>) {
    for op in ops {
        if !is_grouping(op) {
            out.push(op.clone());
            continue;
        }
        match (op.head_name(), op.op(0)) {
            (Some("Delimiter"), None) => out.push(Expression::function("Tuple", vec![])),
            (Some("Delimiter"), Some(body)) if body.head_name() == Some("Sequence") => {
                if body.nops() == 0 {
                    out.push(Expression::function("Tuple", vec![]));
                } else {
                    push_sequence(body.ops(), out);
                }
            }
            (Some("Delimiter"), Some(body)) => push_sequence(slice::from_ref(body), out),
            _ => push_sequence(op.ops(), out),
        }
    }
}

/// Flatten a call to `head` nested inside a call to the same head. Returns
/// a clone of `expr` itself when it is already flat.
pub fn flatten_call(expr: &Expression) -> Expression {
    let Some(head) = expr.head_name() else {
        return expr.clone();
    };
    match flatten_ops(expr.ops(), head) {
        Cow::Borrowed(_) => expr.clone(),
        Cow::Owned(ops) => Expression::function(head, ops),
    }
}
