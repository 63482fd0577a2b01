use bitvec::prelude::*;
use once_cell::sync::OnceCell;

use crate::domain::{Domain, DomainError, DomainLiteral};

const LITERAL_COUNT: usize = DomainLiteral::COUNT;

type LiteralSet = BitArr!(for LITERAL_COUNT, in usize, Lsb0);

/// Ancestor queries over the domain lattice.
///
/// The ancestor table is computed once, on the first query, and is
/// immutable afterward. Initialization is guarded so a lattice can be shared
/// between threads.
#[derive(Debug, Default)]
pub struct DomainLattice {
    table: OnceCell<AncestorTable>,
}

#[derive(Debug)]
struct AncestorTable {
    /// Ancestors of each literal in the order they are first reached.
    ordered: Vec<Vec<DomainLiteral>>,
    /// Same content as `ordered`, for membership tests.
    sets: Vec<LiteralSet>,
}

impl DomainLattice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.table.get().is_some()
    }

    fn table(&self) -> &AncestorTable {
        self.table.get_or_init(AncestorTable::build)
    }

    /// Strict ancestors of a literal; `Anything` has none.
    pub fn literal_ancestors(&self, literal: DomainLiteral) -> &[DomainLiteral] {
        &self.table().ordered[literal.index()]
    }

    /// All the domain literals that are an ancestor of `domain`.
    ///
    /// Constructed domains are first resolved to the literal they stand for
    /// (`["Maybe", D]` to `D`, `["Functions", ...]` to `Functions`, ...).
    /// Those that do not resolve (`Union`, `Intersection`, `Value`) only
    /// report `Anything`.
    pub fn ancestors(&self, domain: &Domain) -> Vec<DomainLiteral> {
        match domain.base_literal() {
            Some(literal) => self.literal_ancestors(literal).to_vec(),
            None => vec![DomainLiteral::Anything],
        }
    }

    pub fn ancestors_of(&self, name: &str) -> Result<Vec<DomainLiteral>, DomainError> {
        let literal: DomainLiteral = name.parse()?;
        Ok(self.literal_ancestors(literal).to_vec())
    }

    pub fn is_subdomain_literal(&self, lhs: DomainLiteral, rhs: DomainLiteral) -> bool {
        lhs == rhs || self.table().sets[lhs.index()][rhs.index()]
    }

    pub fn is_subdomain_of(&self, lhs: &str, rhs: &str) -> Result<bool, DomainError> {
        Ok(self.is_subdomain_literal(lhs.parse()?, rhs.parse()?))
    }

    /// True if every value of `lhs` is also a value of `rhs`.
    pub fn is_subdomain(&self, lhs: &Domain, rhs: &Domain) -> bool {
        use Domain::*;

        if lhs == rhs {
            return true;
        }
        match (lhs, rhs) {
            (_, Literal(DomainLiteral::Anything)) => true,
            (Union(ds), _) => ds.iter().all(|d| self.is_subdomain(d, rhs)),
            (Intersection(ds), _) => ds.iter().any(|d| self.is_subdomain(d, rhs)),
            (_, Union(ds)) => ds.iter().any(|d| self.is_subdomain(lhs, d)),
            (_, Intersection(ds)) => ds.iter().all(|d| self.is_subdomain(lhs, d)),
            (_, Maybe(inner)) => {
                matches!(lhs, Literal(DomainLiteral::Nothing | DomainLiteral::Void))
                    || self.is_subdomain(lhs, inner)
            }
            (Maybe(inner) | Sequence(inner), _) => self.is_subdomain(inner, rhs),
            (_, Literal(rhs)) => match lhs.base_literal() {
                Some(lhs) => self.is_subdomain_literal(lhs, *rhs),
                None => false,
            },
            (List(a), List(b)) | (Dictionary(a), Dictionary(b)) => self.is_subdomain(a, b),
            (Tuple(a), Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| self.is_subdomain(a, b))
            }
            (Functions(_), Functions(_)) => true,
            _ => false,
        }
    }
}

impl AncestorTable {
    fn build() -> Self {
        let mut builder = Builder {
            ordered: vec![None; LITERAL_COUNT],
            sets: vec![LiteralSet::ZERO; LITERAL_COUNT],
            visiting: LiteralSet::ZERO,
        };
        // Walking up from the bottom reaches almost every literal; the sweep
        // picks up the few that are not below `Nothing`.
        builder.visit(DomainLiteral::Void);
        for &literal in DomainLiteral::ALL {
            builder.visit(literal);
        }
        tracing::debug!(literals = LITERAL_COUNT, "domain lattice built");

        Self {
            ordered: builder
                .ordered
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
            sets: builder.sets,
        }
    }
}

struct Builder {
    ordered: Vec<Option<Vec<DomainLiteral>>>,
    sets: Vec<LiteralSet>,
    visiting: LiteralSet,
}

impl Builder {
    fn visit(&mut self, literal: DomainLiteral) {
        let index = literal.index();
        if self.ordered[index].is_some() {
            return;
        }
        assert!(
            !self.visiting[index],
            "cycle in the domain lattice through {literal}"
        );
        self.visiting.set(index, true);

        let mut ordered = Vec::new();
        let mut seen = LiteralSet::ZERO;
        for &parent in literal.parents() {
            self.visit(parent);
            let inherited = self.ordered[parent.index()].as_deref().unwrap_or(&[]);
            for &ancestor in std::iter::once(&parent).chain(inherited) {
                if !seen[ancestor.index()] {
                    seen.set(ancestor.index(), true);
                    ordered.push(ancestor);
                }
            }
        }

        self.visiting.set(index, false);
        self.sets[index] = seen;
        self.ordered[index] = Some(ordered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use DomainLiteral::*;

    #[test]
    fn initialization_is_lazy() {
        let lattice = DomainLattice::new();
        assert!(!lattice.is_initialized());
        assert!(lattice.is_subdomain_literal(Integers, Numbers));
        assert!(lattice.is_initialized());
    }

    #[test]
    fn ancestors_follow_both_parents_in_order() {
        let lattice = DomainLattice::new();
        assert_eq!(
            lattice.literal_ancestors(RealNumbers),
            &[
                ComplexNumbers,
                ExtendedComplexNumbers,
                Numbers,
                Values,
                Anything,
                ExtendedRealNumbers,
            ]
        );
        assert!(lattice.literal_ancestors(Anything).is_empty());
    }

    #[test]
    fn ancestors_are_transitive() {
        let lattice = DomainLattice::new();
        for &a in DomainLiteral::ALL {
            for &b in lattice.literal_ancestors(a) {
                for &c in lattice.literal_ancestors(b) {
                    assert!(
                        lattice.literal_ancestors(a).contains(&c),
                        "{c} is an ancestor of {b} but not of {a}"
                    );
                }
            }
        }
    }

    #[test]
    fn no_literal_is_its_own_ancestor() {
        let lattice = DomainLattice::new();
        for &a in DomainLiteral::ALL {
            assert!(!lattice.literal_ancestors(a).contains(&a), "{a}");
        }
    }

    #[test]
    fn every_literal_reaches_anything() {
        let lattice = DomainLattice::new();
        for &a in DomainLiteral::ALL {
            assert!(lattice.is_subdomain_literal(a, Anything), "{a}");
        }
    }

    #[test]
    fn ancestors_independent_of_query_order() {
        let forward = DomainLattice::new();
        let backward = DomainLattice::new();
        let first: Vec<_> = DomainLiteral::ALL
            .iter()
            .map(|&d| forward.ancestors(&d.into()))
            .collect();
        let mut second: Vec<_> = DomainLiteral::ALL
            .iter()
            .rev()
            .map(|&d| backward.ancestors(&d.into()))
            .collect();
        second.reverse();
        for (mut a, mut b) in first.into_iter().zip(second) {
            a.sort();
            b.sort();
            assert_eq!(a, b);
        }
        assert_eq!(forward.ancestors(&Sets.into()), forward.ancestors(&Sets.into()));
    }

    #[test]
    fn numeric_tower() {
        let lattice = DomainLattice::new();
        assert!(lattice.is_subdomain_literal(PositiveIntegers, Integers));
        assert!(lattice.is_subdomain_literal(NegativeIntegers, NonPositiveIntegers));
        assert!(lattice.is_subdomain_literal(Integers, RealNumbers));
        assert!(lattice.is_subdomain_literal(RealNumbers, ExtendedRealNumbers));
        assert!(lattice.is_subdomain_literal(ImaginaryNumbers, ComplexNumbers));
        assert!(!lattice.is_subdomain_literal(ImaginaryNumbers, RealNumbers));
        assert!(!lattice.is_subdomain_literal(RealNumbers, Integers));
        assert!(!lattice.is_subdomain_literal(Integers, Sets));
    }

    #[test]
    fn bottom_reaches_the_leaves() {
        let lattice = DomainLattice::new();
        assert!(lattice.is_subdomain_literal(Void, Nothing));
        assert!(lattice.is_subdomain_literal(Void, Booleans));
        assert!(lattice.is_subdomain_literal(Nothing, RealNumbers));
    }

    #[test]
    fn constructed_domains_resolve_structurally() {
        let lattice = DomainLattice::new();
        let maybe = Domain::maybe(Integers.into());
        assert_eq!(lattice.ancestors(&maybe), lattice.ancestors(&Integers.into()));

        let function = Domain::Functions(vec![Integers.into(), Booleans.into()]);
        assert_eq!(lattice.ancestors(&function), vec![Anything]);
        assert!(lattice.is_subdomain(&function, &Functions.into()));

        let union = Domain::Union(vec![Integers.into(), Strings.into()]);
        assert_eq!(lattice.ancestors(&union), vec![Anything]);
        assert!(lattice.is_subdomain(&union, &Values.into()));
        assert!(!lattice.is_subdomain(&union, &Numbers.into()));
        assert!(lattice.is_subdomain(&Integers.into(), &union));

        assert!(lattice.is_subdomain(&Void.into(), &maybe));
        assert!(lattice.is_subdomain(
            &Domain::list(PositiveIntegers.into()),
            &Domain::list(Numbers.into())
        ));
        assert!(lattice.is_subdomain(&Domain::Symbol("x".into()), &Symbols.into()));
    }

    #[test]
    fn string_queries_report_unknown_literals() {
        let lattice = DomainLattice::new();
        assert_eq!(lattice.is_subdomain_of("Integers", "Numbers"), Ok(true));
        assert_eq!(
            lattice.ancestors_of("Reals"),
            Err(DomainError::UnknownLiteral("Reals".into()))
        );
    }
}
