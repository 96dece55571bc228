//! Qualifier lattices.
//!
//! A checker supplies its qualifier domain `Q` together with a [`QualifierHierarchy`] describing
//! how the qualifiers relate. The type algebra never inspects qualifiers itself; it only asks the
//! hierarchy.

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::Qualifier;

/// How far a polymorphic placeholder reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolyScope {
    /// Placeholder for the (single) hierarchy it belongs to.
    Hierarchy,
    /// Cross-hierarchy placeholder (`@PolyAll`-style). When unresolved it completes to top on
    /// every position, including type variables and wildcards.
    All,
}

/// Lattice operations over a qualifier domain.
pub trait QualifierHierarchy<Q: Qualifier> {
    fn top(&self) -> Q;

    fn bottom(&self) -> Q;

    fn is_subtype(&self, sub: &Q, sup: &Q) -> bool;

    fn least_upper_bound(&self, a: &Q, b: &Q) -> Q;

    fn greatest_lower_bound(&self, a: &Q, b: &Q) -> Q;

    /// Every qualifier the checker declares, placeholders included.
    fn qualifiers(&self) -> Vec<Q>;

    /// Classify `q` as a polymorphic placeholder. Most qualifiers are not.
    fn polymorphic_scope(&self, q: &Q) -> Option<PolyScope> {
        let _ = q;
        None
    }

    /// Left fold of [`QualifierHierarchy::least_upper_bound`]; `None` for no input.
    fn least_upper_bound_all(&self, qualifiers: &[Q]) -> Option<Q> {
        let (first, rest) = qualifiers.split_first()?;
        Some(
            rest.iter()
                .fold(first.clone(), |acc, q| self.least_upper_bound(&acc, q)),
        )
    }

    /// Left fold of [`QualifierHierarchy::greatest_lower_bound`]; `None` for no input.
    fn greatest_lower_bound_all(&self, qualifiers: &[Q]) -> Option<Q> {
        let (first, rest) = qualifiers.split_first()?;
        Some(
            rest.iter()
                .fold(first.clone(), |acc, q| self.greatest_lower_bound(&acc, q)),
        )
    }

    fn is_top(&self, q: &Q) -> bool {
        *q == self.top()
    }

    fn is_bottom(&self, q: &Q) -> bool {
        *q == self.bottom()
    }

    fn are_equal(&self, a: &Q, b: &Q) -> bool {
        self.is_subtype(a, b) && self.is_subtype(b, a)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("qualifier hierarchy is empty")]
    Empty,
    #[error("qualifier {0} is declared more than once")]
    Duplicate(String),
    #[error("qualifier {qualifier} names undeclared supertype {supertype}")]
    UnknownSupertype { qualifier: String, supertype: String },
    #[error("qualifiers {0} and {1} are subtypes of each other")]
    Cycle(String, String),
    #[error("expected exactly one top qualifier, found [{}]", .0.join(", "))]
    NoUniqueTop(Vec<String>),
    #[error("expected exactly one bottom qualifier, found [{}]", .0.join(", "))]
    NoUniqueBottom(Vec<String>),
    #[error("qualifiers {0} and {1} have no unique least upper bound")]
    NoUniqueLub(String, String),
    #[error("qualifiers {0} and {1} have no unique greatest lower bound")]
    NoUniqueGlb(String, String),
}

fn describe<Q: fmt::Debug>(q: &Q) -> String {
    format!("{q:?}")
}

/// Incrementally declares the qualifiers of a [`GraphHierarchy`].
#[derive(Debug, Clone)]
pub struct GraphHierarchyBuilder<Q> {
    declared: Vec<(Q, Vec<Q>)>,
    polymorphic: HashMap<Q, PolyScope>,
}

impl<Q: Qualifier> Default for GraphHierarchyBuilder<Q> {
    fn default() -> Self {
        Self {
            declared: Vec::new(),
            polymorphic: HashMap::new(),
        }
    }
}

impl<Q: Qualifier> GraphHierarchyBuilder<Q> {
    /// Declare `qualifier` with its direct supertypes.
    pub fn qualifier(mut self, qualifier: Q, supertypes: impl IntoIterator<Item = Q>) -> Self {
        self.declared
            .push((qualifier, supertypes.into_iter().collect()));
        self
    }

    /// Declare a polymorphic placeholder. It is also an ordinary member of the lattice.
    pub fn polymorphic(
        mut self,
        qualifier: Q,
        scope: PolyScope,
        supertypes: impl IntoIterator<Item = Q>,
    ) -> Self {
        self.polymorphic.insert(qualifier.clone(), scope);
        self.qualifier(qualifier, supertypes)
    }

    pub fn build(self) -> Result<GraphHierarchy<Q>, HierarchyError> {
        GraphHierarchy::from_builder(self)
    }
}

/// A finite lattice built from declared direct-supertype edges.
///
/// The subtype relation is the reflexive transitive closure of the declared edges. Construction
/// checks that the result really is a lattice and precomputes every LUB and GLB.
#[derive(Debug, Clone)]
pub struct GraphHierarchy<Q> {
    qualifiers: Vec<Q>,
    index: HashMap<Q, usize>,
    /// `supers[i]` holds every `j` with `qualifiers[i] <: qualifiers[j]`.
    supers: Vec<HashSet<usize>>,
    lubs: Vec<Vec<usize>>,
    glbs: Vec<Vec<usize>>,
    top: usize,
    bottom: usize,
    polymorphic: HashMap<Q, PolyScope>,
}

impl<Q: Qualifier> GraphHierarchy<Q> {
    pub fn builder() -> GraphHierarchyBuilder<Q> {
        GraphHierarchyBuilder::default()
    }

    fn from_builder(builder: GraphHierarchyBuilder<Q>) -> Result<Self, HierarchyError> {
        let GraphHierarchyBuilder {
            declared,
            polymorphic,
        } = builder;
        if declared.is_empty() {
            return Err(HierarchyError::Empty);
        }

        let mut qualifiers = Vec::with_capacity(declared.len());
        let mut index = HashMap::with_capacity(declared.len());
        for (q, _) in &declared {
            if index.insert(q.clone(), qualifiers.len()).is_some() {
                return Err(HierarchyError::Duplicate(describe(q)));
            }
            qualifiers.push(q.clone());
        }

        let n = qualifiers.len();
        let mut supers: Vec<HashSet<usize>> = (0..n).map(|i| HashSet::from([i])).collect();
        for (i, (q, direct)) in declared.iter().enumerate() {
            for sup in direct {
                let Some(&j) = index.get(sup) else {
                    return Err(HierarchyError::UnknownSupertype {
                        qualifier: describe(q),
                        supertype: describe(sup),
                    });
                };
                supers[i].insert(j);
            }
        }

        // Transitive closure (Floyd-Warshall over the reachability matrix).
        for k in 0..n {
            for i in 0..n {
                if supers[i].contains(&k) {
                    let via: Vec<usize> = supers[k].iter().copied().collect();
                    supers[i].extend(via);
                }
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if supers[i].contains(&j) && supers[j].contains(&i) {
                    return Err(HierarchyError::Cycle(
                        describe(&qualifiers[i]),
                        describe(&qualifiers[j]),
                    ));
                }
            }
        }

        let tops: Vec<usize> = (0..n).filter(|&i| supers[i].len() == 1).collect();
        let [top] = tops.as_slice() else {
            return Err(HierarchyError::NoUniqueTop(
                tops.iter().map(|&i| describe(&qualifiers[i])).collect(),
            ));
        };
        let bottoms: Vec<usize> = (0..n)
            .filter(|&i| (0..n).all(|j| supers[i].contains(&j)))
            .collect();
        let [bottom] = bottoms.as_slice() else {
            let minimal: Vec<String> = (0..n)
                .filter(|&i| (0..n).all(|j| j == i || !supers[j].contains(&i)))
                .map(|i| describe(&qualifiers[i]))
                .collect();
            return Err(HierarchyError::NoUniqueBottom(minimal));
        };
        let (top, bottom) = (*top, *bottom);

        let is_sub = |a: usize, b: usize| supers[a].contains(&b);

        let mut lubs = vec![vec![0; n]; n];
        let mut glbs = vec![vec![0; n]; n];
        for a in 0..n {
            for b in a..n {
                let upper: Vec<usize> = (0..n).filter(|&c| is_sub(a, c) && is_sub(b, c)).collect();
                let least: Vec<usize> = upper
                    .iter()
                    .copied()
                    .filter(|&c| upper.iter().all(|&d| is_sub(c, d)))
                    .collect();
                let [lub] = least.as_slice() else {
                    return Err(HierarchyError::NoUniqueLub(
                        describe(&qualifiers[a]),
                        describe(&qualifiers[b]),
                    ));
                };
                lubs[a][b] = *lub;
                lubs[b][a] = *lub;

                let lower: Vec<usize> = (0..n).filter(|&c| is_sub(c, a) && is_sub(c, b)).collect();
                let greatest: Vec<usize> = lower
                    .iter()
                    .copied()
                    .filter(|&c| lower.iter().all(|&d| is_sub(d, c)))
                    .collect();
                let [glb] = greatest.as_slice() else {
                    return Err(HierarchyError::NoUniqueGlb(
                        describe(&qualifiers[a]),
                        describe(&qualifiers[b]),
                    ));
                };
                glbs[a][b] = *glb;
                glbs[b][a] = *glb;
            }
        }

        tracing::debug!(
            target: "nova.qualifiers",
            qualifiers = n,
            top = ?qualifiers[top],
            bottom = ?qualifiers[bottom],
            "built qualifier hierarchy"
        );

        Ok(Self {
            qualifiers,
            index,
            supers,
            lubs,
            glbs,
            top,
            bottom,
            polymorphic,
        })
    }

    fn idx(&self, q: &Q) -> usize {
        match self.index.get(q) {
            Some(&i) => i,
            None => {
                tracing::error!(target: "nova.qualifiers", qualifier = ?q, "qualifier is not part of the hierarchy");
                panic!("qualifier {q:?} is not part of the hierarchy");
            }
        }
    }
}

impl<Q: Qualifier> QualifierHierarchy<Q> for GraphHierarchy<Q> {
    fn top(&self) -> Q {
        self.qualifiers[self.top].clone()
    }

    fn bottom(&self) -> Q {
        self.qualifiers[self.bottom].clone()
    }

    fn is_subtype(&self, sub: &Q, sup: &Q) -> bool {
        self.supers[self.idx(sub)].contains(&self.idx(sup))
    }

    fn least_upper_bound(&self, a: &Q, b: &Q) -> Q {
        self.qualifiers[self.lubs[self.idx(a)][self.idx(b)]].clone()
    }

    fn greatest_lower_bound(&self, a: &Q, b: &Q) -> Q {
        self.qualifiers[self.glbs[self.idx(a)][self.idx(b)]].clone()
    }

    fn qualifiers(&self) -> Vec<Q> {
        self.qualifiers.clone()
    }

    fn polymorphic_scope(&self, q: &Q) -> Option<PolyScope> {
        self.polymorphic.get(q).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Taint {
        Tainted,
        Untainted,
        Poly,
        Bottom,
    }

    fn taint() -> GraphHierarchy<Taint> {
        GraphHierarchy::builder()
            .qualifier(Taint::Tainted, [])
            .qualifier(Taint::Untainted, [Taint::Tainted])
            .polymorphic(Taint::Poly, PolyScope::Hierarchy, [Taint::Tainted])
            .qualifier(Taint::Bottom, [Taint::Untainted, Taint::Poly])
            .build()
            .unwrap()
    }

    #[test]
    fn diamond_has_lub_and_glb() {
        let h = taint();
        assert_eq!(h.top(), Taint::Tainted);
        assert_eq!(h.bottom(), Taint::Bottom);
        assert_eq!(
            h.least_upper_bound(&Taint::Untainted, &Taint::Poly),
            Taint::Tainted
        );
        assert_eq!(
            h.greatest_lower_bound(&Taint::Untainted, &Taint::Poly),
            Taint::Bottom
        );
        assert!(h.is_subtype(&Taint::Bottom, &Taint::Tainted));
        assert!(!h.is_subtype(&Taint::Poly, &Taint::Untainted));
        assert_eq!(h.polymorphic_scope(&Taint::Poly), Some(PolyScope::Hierarchy));
        assert_eq!(h.polymorphic_scope(&Taint::Untainted), None);
    }

    #[test]
    fn folds_skip_empty_input() {
        let h = taint();
        assert_eq!(h.least_upper_bound_all(&[]), None);
        assert_eq!(
            h.least_upper_bound_all(&[Taint::Bottom, Taint::Untainted, Taint::Bottom]),
            Some(Taint::Untainted)
        );
        assert_eq!(
            h.greatest_lower_bound_all(&[Taint::Tainted, Taint::Poly]),
            Some(Taint::Poly)
        );
    }

    #[test]
    fn rejects_two_tops() {
        let err = GraphHierarchy::builder()
            .qualifier(Taint::Tainted, [])
            .qualifier(Taint::Untainted, [])
            .qualifier(Taint::Bottom, [Taint::Tainted, Taint::Untainted])
            .build()
            .unwrap_err();
        assert!(matches!(err, HierarchyError::NoUniqueTop(tops) if tops.len() == 2));
    }

    #[test]
    fn rejects_cycles_and_unknown_edges() {
        let err = GraphHierarchy::builder()
            .qualifier(Taint::Tainted, [Taint::Untainted])
            .qualifier(Taint::Untainted, [Taint::Tainted])
            .build()
            .unwrap_err();
        assert!(matches!(err, HierarchyError::Cycle(..)));

        let err = GraphHierarchy::builder()
            .qualifier(Taint::Untainted, [Taint::Tainted])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            HierarchyError::UnknownSupertype {
                qualifier: "Untainted".to_string(),
                supertype: "Tainted".to_string(),
            }
        );
    }
}
