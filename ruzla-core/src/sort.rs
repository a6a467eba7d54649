//! Hash-Consed Sort Descriptors.
//!
//! Sorts are interned in the [`TermManager`](crate::TermManager)'s sort
//! table: equal structure yields equal [`SortId`]s, so sort equality is id
//! equality.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Identifier of an interned sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SortId(pub(crate) u32);

impl SortId {
    /// The raw index.
    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// The structure of a sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKind {
    /// The Boolean sort.
    Bool,
    /// A bit-vector sort of the given width (>= 1).
    Bv(u64),
    /// A floating-point sort with exponent and significand widths (>= 2).
    Fp(u64, u64),
    /// The rounding-mode sort.
    Rm,
    /// An array sort: index and element sorts.
    Array(SortId, SortId),
    /// A function sort: domain sorts followed by the codomain.
    Fun(SmallVec<[SortId; 4]>),
    /// An uninterpreted sort with a symbol.
    Uninterpreted(Box<str>),
}

/// The sort table: an arena of sort descriptors with a uniqueness map.
#[derive(Debug, Default)]
pub struct SortTable {
    sorts: Vec<SortKind>,
    unique: FxHashMap<SortKind, SortId>,
}

impl SortTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a sort, returning the existing id for equal structure.
    pub fn intern(&mut self, kind: SortKind) -> SortId {
        if let Some(&id) = self.unique.get(&kind) {
            return id;
        }
        let id = SortId(self.sorts.len() as u32);
        self.sorts.push(kind.clone());
        self.unique.insert(kind, id);
        id
    }

    /// Look up a sort's structure.
    #[must_use]
    pub fn get(&self, id: SortId) -> &SortKind {
        &self.sorts[id.0 as usize]
    }

    /// Number of interned sorts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sorts.len()
    }

    /// True if no sorts are interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_unique() {
        let mut table = SortTable::new();
        let a = table.intern(SortKind::Bv(8));
        let b = table.intern(SortKind::Bv(8));
        let c = table.intern(SortKind::Bv(16));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_structural_equality() {
        let mut table = SortTable::new();
        let idx = table.intern(SortKind::Bv(8));
        let elem = table.intern(SortKind::Bv(32));
        let arr1 = table.intern(SortKind::Array(idx, elem));
        let arr2 = table.intern(SortKind::Array(idx, elem));
        assert_eq!(arr1, arr2);
        assert_eq!(table.get(arr1), &SortKind::Array(idx, elem));
    }
}
