use crate::dictionary::{Associativity, Dictionary, Entry, Kind, SerializeStrategy};
use crate::expression::{Expression, Head, Number};
use crate::token::join_latex;

/// Renders expressions back to LaTeX through the canonical (named) entries
/// of a dictionary.
pub struct Serializer<'a> {
    dictionary: &'a Dictionary,
}

impl<'a> Serializer<'a> {
    pub fn new(dictionary: &'a Dictionary) -> Self {
        Self { dictionary }
    }

    pub fn dictionary(&self) -> &'a Dictionary {
        self.dictionary
    }

    pub fn serialize(&self, expr: &Expression) -> String {
        match expr {
            Expression::Number(n) => serialize_number(*n),
            Expression::Symbol(name) => self.serialize_symbol(name),
            Expression::String(value) => format!("\\text{{{value}}}"),
            Expression::Function(_) => self.serialize_function(expr),
        }
    }

    fn serialize_symbol(&self, name: &str) -> String {
        let trigger = self
            .dictionary
            .by_name(name)
            .filter(|entry| entry.kind == Kind::Symbol)
            .and_then(|entry| entry.triggers.first());
        match trigger {
            Some(trigger) => trigger.latex.clone(),
            None if name.chars().count() == 1 => name.to_string(),
            None => format!("\\operatorname{{{name}}}"),
        }
    }

    fn serialize_function(&self, expr: &Expression) -> String {
        let name = match expr.head() {
            Some(Head::Name(name)) => name.as_ref(),
            Some(Head::Expression(head)) => {
                return join_latex([self.serialize(head), self.arguments(expr)]);
            }
            None => return String::new(),
        };
        if name == "Error" {
            // The source the error was produced from.
            return expr
                .ops()
                .iter()
                .find(|op| op.head_name() == Some("LatexString"))
                .and_then(|op| op.op(0))
                .and_then(Expression::string_value)
                .unwrap_or_default()
                .to_string();
        }
        if let Some(entry) = self.dictionary.by_name(name) {
            if let SerializeStrategy::Custom(serialize) = entry.serialize {
                return serialize(self, expr);
            }
            if let Some(latex) = self.serialize_entry(entry, expr) {
                return latex;
            }
        }
        join_latex([format!("\\operatorname{{{name}}}"), self.arguments(expr)])
    }

    fn arguments(&self, expr: &Expression) -> String {
        let args: Vec<_> = expr.ops().iter().map(|op| self.serialize(op)).collect();
        join_latex(["\\left(".to_string(), args.join(", "), "\\right)".to_string()])
    }

    /// Default form of a named entry, or `None` when the operand count does
    /// not fit its kind.
    fn serialize_entry(&self, entry: &Entry, expr: &Expression) -> Option<String> {
        let trigger = entry.triggers.first()?.latex.clone();
        let precedence = entry.precedence();
        match (entry.kind, expr.ops()) {
            (Kind::Infix, ops @ [_, _, ..]) => {
                let mut parts = Vec::with_capacity(ops.len() * 2);
                for (i, op) in ops.iter().enumerate() {
                    // Equal precedence on the side the operator does not
                    // associate to needs parentheses.
                    let strict = match entry.associativity {
                        Associativity::Right => i == 0,
                        Associativity::Left | Associativity::NonAssociative => i > 0,
                    };
                    if i > 0 {
                        parts.push(trigger.clone());
                    }
                    parts.push(self.operand(op, precedence, strict));
                }
                Some(join_latex(parts))
            }
            (Kind::Prefix, [op]) => Some(join_latex([trigger, self.operand(op, precedence, false)])),
            (Kind::Postfix, [op]) => Some(join_latex([self.operand(op, precedence, false), trigger])),
            (Kind::Matchfix, ops) => {
                let close = entry.close.as_ref()?.latex.clone();
                let body: Vec<_> = ops.iter().map(|op| self.serialize(op)).collect();
                Some(join_latex([trigger, body.join(", "), close]))
            }
            _ => None,
        }
    }

    /// An operand of an operator of `precedence`, wrapped in parentheses if
    /// it binds less tightly.
    fn operand(&self, op: &Expression, precedence: u16, strict: bool) -> String {
        let latex = self.serialize(op);
        let operand_precedence = op
            .head_name()
            .and_then(|head| self.dictionary.by_name(head))
            .filter(|entry| matches!(entry.kind, Kind::Infix | Kind::Prefix))
            .map(Entry::precedence);
        let wrap = match operand_precedence {
            Some(p) => p < precedence || (strict && p == precedence),
            None => false,
        };
        if wrap {
            join_latex(["\\left(", latex.as_str(), "\\right)"])
        } else {
            latex
        }
    }
}

fn serialize_number(n: Number) -> String {
    match n {
        Number::Integer(value) => value.to_string(),
        Number::Float(value) if value.is_nan() => "\\operatorname{NaN}".to_string(),
        Number::Float(value) if value.is_infinite() => {
            let latex = if value > 0.0 { "\\infty" } else { "-\\infty" };
            latex.to_string()
        }
        Number::Float(value) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;
    use pretty_assertions::assert_eq;

    fn call(head: &str, ops: Vec<Expression>) -> Expression {
        Expression::function(head, ops)
    }

    fn sym(name: &str) -> Expression {
        Expression::symbol(name)
    }

    #[test]
    fn atoms() {
        let engine = Engine::new();
        assert_eq!(engine.serialize(&Expression::integer(-3)), "-3");
        assert_eq!(engine.serialize(&Expression::float(2.5)), "2.5");
        assert_eq!(engine.serialize(&Expression::float(f64::NEG_INFINITY)), "-\\infty");
        assert_eq!(engine.serialize(&sym("x")), "x");
        assert_eq!(engine.serialize(&sym("speed")), "\\operatorname{speed}");
        assert_eq!(engine.serialize(&Expression::string("hi")), "\\text{hi}");
    }

    #[test]
    fn symbols_use_the_canonical_trigger() {
        let engine = Engine::new();
        assert_eq!(engine.serialize(&sym("RealNumber")), "\\R");
        assert_eq!(engine.serialize(&sym("NonNegativeInteger")), "\\N");
        assert_eq!(engine.serialize(&sym("PositiveNumber")), "\\R^+");
    }

    #[test]
    fn operators_and_parentheses() {
        let engine = Engine::new();
        let sum = call("Add", vec![sym("a"), sym("b")]);
        assert_eq!(engine.serialize(&sum), "a+b");
        assert_eq!(
            engine.serialize(&call("Multiply", vec![sum.clone(), sym("c")])),
            "\\left(a+b\\right)\\cdot c"
        );
        let difference = call("Subtract", vec![sym("b"), sym("c")]);
        assert_eq!(
            engine.serialize(&call("Subtract", vec![sym("a"), difference])),
            "a-\\left(b-c\\right)"
        );
        assert_eq!(engine.serialize(&call("Negate", vec![sym("a")])), "-a");
        assert_eq!(
            engine.serialize(&call("Complement", vec![sym("RealNumber")])),
            "\\R^{\\complement}"
        );
    }

    #[test]
    fn unknown_heads_fall_back_to_operatorname() {
        let engine = Engine::new();
        assert_eq!(
            engine.serialize(&call("Gcd", vec![sym("a"), sym("b")])),
            "\\operatorname{Gcd}\\left(a, b\\right)"
        );
        let applied = Expression::function(call("Derivative", vec![sym("f")]), vec![sym("x")]);
        assert_eq!(
            engine.serialize(&applied),
            "\\operatorname{Derivative}\\left(f\\right)\\left(x\\right)"
        );
    }

    #[test]
    fn errors_serialize_to_their_source() {
        let engine = Engine::new();
        let expr = engine.parse("\\foo{x}");
        assert_eq!(engine.serialize(&expr), "\\foo{x}");
    }

    #[test]
    fn parse_serialize_parse_is_stable() {
        let engine = Engine::new();
        for latex in ["a+b\\times c", "(a+b)c", "x^{y+1}", "\\R\\times\\Z", "x\\in\\R^+"] {
            let expr = engine.parse(latex);
            let again = engine.parse(&engine.serialize(&expr));
            assert_eq!(again, expr, "{latex}");
        }
    }
}
