use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::expression::Expression;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown-domain-literal: `{0}`")]
    UnknownLiteral(String),
    /// A domain expression used a constructor this crate does not know. This
    /// is a configuration bug, not bad user input.
    #[error("unknown domain constructor `{0}`")]
    UnknownConstructor(String),
    #[error("malformed `{constructor}` domain: {reason}")]
    Malformed {
        constructor: &'static str,
        reason: &'static str,
    },
}

impl DomainError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownLiteral(_) => "unknown-domain-literal",
            Self::UnknownConstructor(_) => "unknown-domain-constructor",
            Self::Malformed { .. } => "malformed-domain",
        }
    }
}

macro_rules! domain_literals {
    ($($literal:ident => [$($parent:ident),*],)*) => {
        /// A named domain of the lattice.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum DomainLiteral {
            $($literal,)*
        }

        impl DomainLiteral {
            pub const ALL: &'static [DomainLiteral] = &[$(DomainLiteral::$literal,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(DomainLiteral::$literal => stringify!($literal),)*
                }
            }

            /// Immediate parents (supersets) of this domain.
            pub fn parents(self) -> &'static [DomainLiteral] {
                match self {
                    $(DomainLiteral::$literal => &[$(DomainLiteral::$parent),*],)*
                }
            }

            pub fn from_name(name: &str) -> Option<DomainLiteral> {
                match name {
                    $(stringify!($literal) => Some(DomainLiteral::$literal),)*
                    _ => None,
                }
            }
        }
    };
}

// `Anything` is the top of the lattice and `Void` the bottom. `Nothing` sits
// just above `Void` and lists the leaves so that every literal is reachable
// upward from the bottom.
domain_literals! {
    Anything => [],

    Values => [Anything],
    Domains => [Anything],

    Void => [Nothing],
    Nothing => [
        Booleans,
        Strings,
        Symbols,
        Tuples,
        Lists,
        Dictionaries,
        ImaginaryNumbers,
        TranscendentalNumbers,
        PositiveIntegers,
        NegativeIntegers,
        NonPositiveIntegers,
        NonNegativeIntegers,
        PositiveNumbers,
        NegativeNumbers,
        NonPositiveNumbers,
        NonNegativeNumbers,
        LogicOperators,
        RelationalOperators
    ],

    MaybeBooleans => [Values],
    Booleans => [MaybeBooleans],

    Strings => [Values],
    Symbols => [Values],

    Collections => [Values],
    Lists => [Collections],
    Dictionaries => [Collections],
    Sequences => [Collections],
    Tuples => [Collections],
    Sets => [Collections],

    Functions => [Anything],
    Predicates => [Functions],
    LogicOperators => [Predicates],
    RelationalOperators => [Predicates],
    NumericFunctions => [Functions],
    RealFunctions => [NumericFunctions],

    Numbers => [Values],
    ExtendedComplexNumbers => [Numbers],
    ComplexNumbers => [ExtendedComplexNumbers],
    ImaginaryNumbers => [ComplexNumbers],
    ExtendedRealNumbers => [ExtendedComplexNumbers],
    RealNumbers => [ComplexNumbers, ExtendedRealNumbers],

    PositiveNumbers => [NonNegativeNumbers],
    NonNegativeNumbers => [RealNumbers],
    NonPositiveNumbers => [RealNumbers],
    NegativeNumbers => [NonPositiveNumbers],

    TranscendentalNumbers => [RealNumbers],
    AlgebraicNumbers => [RealNumbers],
    RationalNumbers => [AlgebraicNumbers],
    Integers => [RationalNumbers],

    PositiveIntegers => [NonNegativeIntegers],
    NonNegativeIntegers => [Integers],
    NonPositiveIntegers => [Integers],
    NegativeIntegers => [NonPositiveIntegers],
}

impl DomainLiteral {
    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }

    /// The function signature a functional literal stands for.
    pub fn signature(self) -> Option<Domain> {
        use DomainLiteral::*;

        let lit = Domain::Literal;
        let signature = match self {
            NumericFunctions => vec![Domain::sequence(lit(Numbers)), lit(Numbers)],
            RealFunctions => vec![
                Domain::sequence(lit(ExtendedRealNumbers)),
                lit(ExtendedRealNumbers),
            ],
            LogicOperators => vec![
                lit(MaybeBooleans),
                Domain::maybe(lit(MaybeBooleans)),
                lit(MaybeBooleans),
            ],
            Predicates => vec![Domain::sequence(lit(Anything)), lit(MaybeBooleans)],
            RelationalOperators => vec![lit(Anything), lit(Anything), lit(MaybeBooleans)],
            _ => return None,
        };
        Some(Domain::Functions(signature))
    }
}

impl fmt::Display for DomainLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DomainLiteral {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| DomainError::UnknownLiteral(s.to_string()))
    }
}

pub fn is_domain_literal(name: &str) -> bool {
    DomainLiteral::from_name(name).is_some()
}

/// Parameterized domain constructors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DomainConstructor {
    Functions,
    List,
    Tuple,
    Maybe,
    Sequence,
    Union,
    Intersection,
    Head,
    Symbol,
    Value,
    Dictionary,
}

impl DomainConstructor {
    pub fn name(self) -> &'static str {
        match self {
            Self::Functions => "Functions",
            Self::List => "List",
            Self::Tuple => "Tuple",
            Self::Maybe => "Maybe",
            Self::Sequence => "Sequence",
            Self::Union => "Union",
            Self::Intersection => "Intersection",
            Self::Head => "Head",
            Self::Symbol => "Symbol",
            Self::Value => "Value",
            Self::Dictionary => "Dictionary",
        }
    }
}

impl FromStr for DomainConstructor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Functions" => Self::Functions,
            "List" => Self::List,
            "Tuple" => Self::Tuple,
            "Maybe" => Self::Maybe,
            "Sequence" => Self::Sequence,
            "Union" => Self::Union,
            "Intersection" => Self::Intersection,
            "Head" => Self::Head,
            "Symbol" => Self::Symbol,
            "Value" => Self::Value,
            "Dictionary" => Self::Dictionary,
            _ => return Err(DomainError::UnknownConstructor(s.to_string())),
        })
    }
}

/// A domain descriptor: a lattice literal or a constructed domain.
#[derive(Clone, Debug, PartialEq)]
pub enum Domain {
    Literal(DomainLiteral),
    /// Parameter domains followed by the result domain.
    Functions(Vec<Domain>),
    List(Box<Domain>),
    Tuple(Vec<Domain>),
    Maybe(Box<Domain>),
    Sequence(Box<Domain>),
    Union(Vec<Domain>),
    Intersection(Vec<Domain>),
    Head(String),
    Symbol(String),
    Value(Expression),
    Dictionary(Box<Domain>),
}

impl From<DomainLiteral> for Domain {
    fn from(literal: DomainLiteral) -> Self {
        Self::Literal(literal)
    }
}

impl Domain {
    pub fn maybe(domain: Domain) -> Self {
        Self::Maybe(Box::new(domain))
    }

    pub fn sequence(domain: Domain) -> Self {
        Self::Sequence(Box::new(domain))
    }

    pub fn list(domain: Domain) -> Self {
        Self::List(Box::new(domain))
    }

    pub fn as_literal(&self) -> Option<DomainLiteral> {
        match self {
            Self::Literal(literal) => Some(*literal),
            _ => None,
        }
    }

    pub fn constructor(&self) -> Option<DomainConstructor> {
        Some(match self {
            Self::Literal(_) => return None,
            Self::Functions(_) => DomainConstructor::Functions,
            Self::List(_) => DomainConstructor::List,
            Self::Tuple(_) => DomainConstructor::Tuple,
            Self::Maybe(_) => DomainConstructor::Maybe,
            Self::Sequence(_) => DomainConstructor::Sequence,
            Self::Union(_) => DomainConstructor::Union,
            Self::Intersection(_) => DomainConstructor::Intersection,
            Self::Head(_) => DomainConstructor::Head,
            Self::Symbol(_) => DomainConstructor::Symbol,
            Self::Value(_) => DomainConstructor::Value,
            Self::Dictionary(_) => DomainConstructor::Dictionary,
        })
    }

    /// The literal a domain resolves to structurally, or `None` when the
    /// only thing known about it is that it is `Anything`.
    pub fn base_literal(&self) -> Option<DomainLiteral> {
        match self {
            Self::Literal(literal) => Some(*literal),
            Self::Functions(_) | Self::Head(_) => Some(DomainLiteral::Functions),
            Self::Symbol(_) => Some(DomainLiteral::Symbols),
            Self::Tuple(_) => Some(DomainLiteral::Tuples),
            Self::List(_) => Some(DomainLiteral::Lists),
            Self::Dictionary(_) => Some(DomainLiteral::Dictionaries),
            Self::Maybe(inner) | Self::Sequence(inner) => inner.base_literal(),
            Self::Union(_) | Self::Intersection(_) | Self::Value(_) => None,
        }
    }

    /// Read a domain from its expression form, e.g. `["Maybe", "Integers"]`.
    pub fn from_expression(expr: &Expression) -> Result<Self, DomainError> {
        if let Some(name) = expr.symbol_name() {
            return Ok(Self::Literal(name.parse()?));
        }
        if let Some(name) = expr.string_value() {
            return Ok(Self::Literal(name.parse()?));
        }
        let Some(head) = expr.head_name() else {
            return Err(DomainError::UnknownLiteral(expr.to_string()));
        };
        let constructor: DomainConstructor = head.parse()?;
        let ops = expr.ops();
        let all = || ops.iter().map(Self::from_expression).collect::<Result<Vec<_>, _>>();
        let single = || match ops {
            [only] => Self::from_expression(only).map(Box::new),
            _ => Err(DomainError::Malformed {
                constructor: constructor.name(),
                reason: "expected exactly one argument",
            }),
        };
        let name = || match ops {
            [only] => only
                .symbol_name()
                .or_else(|| only.string_value())
                .map(str::to_string)
                .ok_or(DomainError::Malformed {
                    constructor: constructor.name(),
                    reason: "expected a name",
                }),
            _ => Err(DomainError::Malformed {
                constructor: constructor.name(),
                reason: "expected exactly one argument",
            }),
        };

        Ok(match constructor {
            DomainConstructor::Functions => {
                if ops.is_empty() {
                    return Err(DomainError::Malformed {
                        constructor: constructor.name(),
                        reason: "expected a result domain",
                    });
                }
                Self::Functions(all()?)
            }
            DomainConstructor::Tuple => Self::Tuple(all()?),
            DomainConstructor::Union => Self::Union(all()?),
            DomainConstructor::Intersection => Self::Intersection(all()?),
            DomainConstructor::List => Self::List(single()?),
            DomainConstructor::Maybe => Self::Maybe(single()?),
            DomainConstructor::Sequence => Self::Sequence(single()?),
            DomainConstructor::Dictionary => Self::Dictionary(single()?),
            DomainConstructor::Head => Self::Head(name()?),
            DomainConstructor::Symbol => Self::Symbol(name()?),
            DomainConstructor::Value => match ops {
                [only] => Self::Value(only.clone()),
                _ => {
                    return Err(DomainError::Malformed {
                        constructor: constructor.name(),
                        reason: "expected exactly one argument",
                    })
                }
            },
        })
    }

    pub fn to_expression(&self) -> Expression {
        let Some(constructor) = self.constructor() else {
            return match self.as_literal() {
                Some(literal) => Expression::symbol(literal.name()),
                None => Expression::symbol("Anything"),
            };
        };
        let ops = match self {
            Self::Literal(_) => vec![],
            Self::Functions(ds) | Self::Tuple(ds) | Self::Union(ds) | Self::Intersection(ds) => {
                ds.iter().map(Self::to_expression).collect()
            }
            Self::List(d) | Self::Maybe(d) | Self::Sequence(d) | Self::Dictionary(d) => {
                vec![d.to_expression()]
            }
            Self::Head(name) | Self::Symbol(name) => vec![Expression::symbol(name)],
            Self::Value(value) => vec![value.clone()],
        };
        Expression::function(constructor.name(), ops)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => f.write_str(literal.name()),
            domain => write!(f, "{}", domain.to_expression()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_names_round_trip() {
        for literal in DomainLiteral::ALL {
            assert_eq!(literal.name().parse::<DomainLiteral>(), Ok(*literal));
        }
        assert_eq!(DomainLiteral::COUNT, DomainLiteral::ALL.len());
        assert!(is_domain_literal("RealNumbers"));
        assert!(!is_domain_literal("RealNumber"));
    }

    #[test]
    fn unknown_literal_is_a_recoverable_error() {
        let err = "Reals".parse::<DomainLiteral>().unwrap_err();
        assert_eq!(err, DomainError::UnknownLiteral("Reals".into()));
        assert_eq!(err.code(), "unknown-domain-literal");
    }

    #[test]
    fn real_numbers_have_two_parents() {
        assert_eq!(
            DomainLiteral::RealNumbers.parents(),
            &[
                DomainLiteral::ComplexNumbers,
                DomainLiteral::ExtendedRealNumbers
            ]
        );
        assert!(DomainLiteral::Anything.parents().is_empty());
    }

    #[test]
    fn domain_from_expression() {
        let expr = Expression::function(
            "Maybe",
            vec![Expression::function("List", vec![Expression::symbol("Integers")])],
        );
        let domain = Domain::from_expression(&expr).unwrap();
        assert_eq!(
            domain,
            Domain::maybe(Domain::list(DomainLiteral::Integers.into()))
        );
        assert_eq!(domain.base_literal(), Some(DomainLiteral::Lists));
        assert_eq!(domain.to_expression(), expr);
    }

    #[test]
    fn unknown_constructor_is_distinguished() {
        let expr = Expression::function("Matrix", vec![Expression::symbol("Integers")]);
        assert_eq!(
            Domain::from_expression(&expr),
            Err(DomainError::UnknownConstructor("Matrix".into()))
        );
        let expr = Expression::function("Maybe", vec![]);
        assert!(matches!(
            Domain::from_expression(&expr),
            Err(DomainError::Malformed { constructor: "Maybe", .. })
        ));
    }

    #[test]
    fn functional_literals_have_signatures() {
        let signature = DomainLiteral::NumericFunctions.signature().unwrap();
        assert_eq!(signature.to_string(), r#"["Functions",["Sequence","Numbers"],"Numbers"]"#);
        assert_eq!(DomainLiteral::Integers.signature(), None);
    }
}
