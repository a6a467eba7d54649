//! Hash-Consed Term DAG.
//!
//! The [`TermManager`] owns all nodes in an arena indexed by [`TermId`].
//! A uniqueness table guarantees that structurally equal terms share one
//! id, so term equality is id equality. Nodes carry external reference
//! counts; [`TermManager::release`] plus [`TermManager::collect_garbage`]
//! reclaim nodes no external handle can reach.

pub mod kind;
mod typecheck;

pub use kind::Kind;

use crate::bv::BitVector;
use crate::error::{type_error, Error, Result};
use crate::fp::{FloatingPoint, FpFormat, RoundingMode};
use crate::sort::{SortId, SortKind, SortTable};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Identifier of a term node. Equality of terms is equality of ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u64);

impl TermId {
    /// The raw id.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }

    fn slot(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl std::fmt::Display for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A concrete value payload attached to a `Kind::Value` node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// A Boolean value.
    Bool(bool),
    /// A bit-vector value.
    BitVector(BitVector),
    /// A floating-point value.
    FloatingPoint(FloatingPoint),
    /// A rounding-mode value.
    RoundingMode(RoundingMode),
}

impl Value {
    /// The Boolean payload, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The bit-vector payload, if this is one.
    #[must_use]
    pub fn as_bitvector(&self) -> Option<&BitVector> {
        match self {
            Value::BitVector(bv) => Some(bv),
            _ => None,
        }
    }

    /// The floating-point payload, if this is one.
    #[must_use]
    pub fn as_floating_point(&self) -> Option<&FloatingPoint> {
        match self {
            Value::FloatingPoint(fp) => Some(fp),
            _ => None,
        }
    }

    /// The rounding-mode payload, if this is one.
    #[must_use]
    pub fn as_rounding_mode(&self) -> Option<RoundingMode> {
        match self {
            Value::RoundingMode(rm) => Some(*rm),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct NodeData {
    kind: Kind,
    children: SmallVec<[TermId; 4]>,
    indices: SmallVec<[u64; 2]>,
    sort: SortId,
    symbol: Option<Box<str>>,
    value: Option<Value>,
    ext_refs: u64,
    parent_refs: u64,
}

/// Uniqueness-table key. Constants and variables are intentionally absent:
/// every `mk_const` / `mk_var` call creates a fresh node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Op(Kind, SmallVec<[TermId; 4]>, SmallVec<[u64; 2]>, SortId),
    Value(Value),
}

/// The process-wide term and sort store.
#[derive(Debug, Default)]
pub struct TermManager {
    nodes: Vec<Option<NodeData>>,
    unique: FxHashMap<NodeKey, TermId>,
    free: Vec<usize>,
    sorts: SortTable,
}

impl TermManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /* ---- sort constructors ---------------------------------------------- */

    /// The Boolean sort.
    pub fn mk_bool_sort(&mut self) -> SortId {
        self.sorts.intern(SortKind::Bool)
    }

    /// A bit-vector sort; the width must be at least 1.
    pub fn mk_bv_sort(&mut self, width: u64) -> Result<SortId> {
        if width < 1 {
            return Err(type_error("bit-vector width must be >= 1"));
        }
        Ok(self.sorts.intern(SortKind::Bv(width)))
    }

    /// A floating-point sort; both widths must be at least 2.
    pub fn mk_fp_sort(&mut self, exp_bits: u64, sig_bits: u64) -> Result<SortId> {
        if exp_bits < 2 || sig_bits < 2 {
            return Err(type_error("floating-point widths must be >= 2"));
        }
        Ok(self.sorts.intern(SortKind::Fp(exp_bits, sig_bits)))
    }

    /// The rounding-mode sort.
    pub fn mk_rm_sort(&mut self) -> SortId {
        self.sorts.intern(SortKind::Rm)
    }

    /// An array sort over index and element sorts.
    pub fn mk_array_sort(&mut self, index: SortId, element: SortId) -> Result<SortId> {
        if matches!(self.sorts.get(index), SortKind::Fun(_))
            || matches!(self.sorts.get(element), SortKind::Fun(_))
        {
            return Err(type_error("array sorts cannot range over function sorts"));
        }
        Ok(self.sorts.intern(SortKind::Array(index, element)))
    }

    /// A function sort from domain sorts to a codomain.
    pub fn mk_fun_sort(&mut self, domain: &[SortId], codomain: SortId) -> Result<SortId> {
        if domain.is_empty() {
            return Err(type_error("function sorts need at least one domain sort"));
        }
        for &d in domain {
            if matches!(self.sorts.get(d), SortKind::Fun(_)) {
                return Err(type_error("higher-order function sorts are not supported"));
            }
        }
        if matches!(self.sorts.get(codomain), SortKind::Fun(_)) {
            return Err(type_error("higher-order function sorts are not supported"));
        }
        let mut all: SmallVec<[SortId; 4]> = domain.iter().copied().collect();
        all.push(codomain);
        Ok(self.sorts.intern(SortKind::Fun(all)))
    }

    /// An uninterpreted sort with the given symbol.
    pub fn mk_uninterpreted_sort(&mut self, symbol: &str) -> SortId {
        self.sorts.intern(SortKind::Uninterpreted(symbol.into()))
    }

    /* ---- sort accessors -------------------------------------------------- */

    /// The structure of a sort.
    #[must_use]
    pub fn sort_kind(&self, sort: SortId) -> &SortKind {
        self.sorts.get(sort)
    }

    /// True if `sort` is the Boolean sort.
    #[must_use]
    pub fn is_bool_sort(&self, sort: SortId) -> bool {
        matches!(self.sorts.get(sort), SortKind::Bool)
    }

    /// True if `sort` is the rounding-mode sort.
    #[must_use]
    pub fn is_rm_sort(&self, sort: SortId) -> bool {
        matches!(self.sorts.get(sort), SortKind::Rm)
    }

    /// The width of a bit-vector sort.
    #[must_use]
    pub fn bv_width(&self, sort: SortId) -> Option<u64> {
        match self.sorts.get(sort) {
            SortKind::Bv(w) => Some(*w),
            _ => None,
        }
    }

    /// The format of a floating-point sort.
    #[must_use]
    pub fn fp_format(&self, sort: SortId) -> Option<FpFormat> {
        match self.sorts.get(sort) {
            SortKind::Fp(e, s) => Some(FpFormat::new(*e, *s)),
            _ => None,
        }
    }

    /// The index and element sorts of an array sort.
    #[must_use]
    pub fn array_sorts(&self, sort: SortId) -> Option<(SortId, SortId)> {
        match self.sorts.get(sort) {
            SortKind::Array(i, e) => Some((*i, *e)),
            _ => None,
        }
    }

    /// The domain and codomain sorts of a function sort (codomain last).
    #[must_use]
    pub fn fun_sorts(&self, sort: SortId) -> Option<&[SortId]> {
        match self.sorts.get(sort) {
            SortKind::Fun(all) => Some(all),
            _ => None,
        }
    }

    /* ---- node storage ----------------------------------------------------- */

    fn node(&self, t: TermId) -> &NodeData {
        self.nodes[t.slot()]
            .as_ref()
            .expect("live term id")
    }

    fn node_mut(&mut self, t: TermId) -> &mut NodeData {
        self.nodes[t.slot()]
            .as_mut()
            .expect("live term id")
    }

    fn insert(&mut self, data: NodeData) -> TermId {
        for &child in &data.children {
            self.node_mut(child).parent_refs += 1;
        }
        if let Some(slot) = self.free.pop() {
            let id = TermId(slot as u64 + 1);
            self.nodes[slot] = Some(data);
            id
        } else {
            self.nodes.push(Some(data));
            TermId(self.nodes.len() as u64)
        }
    }

    fn intern(&mut self, key: NodeKey, data: NodeData) -> TermId {
        if let Some(&id) = self.unique.get(&key) {
            self.node_mut(id).ext_refs += 1;
            return id;
        }
        let id = self.insert(data);
        self.unique.insert(key, id);
        id
    }

    /* ---- accessors -------------------------------------------------------- */

    /// The kind of a term.
    #[must_use]
    pub fn kind(&self, t: TermId) -> Kind {
        self.node(t).kind
    }

    /// The sort of a term.
    #[must_use]
    pub fn sort(&self, t: TermId) -> SortId {
        self.node(t).sort
    }

    /// The children of a term.
    #[must_use]
    pub fn children(&self, t: TermId) -> &[TermId] {
        &self.node(t).children
    }

    /// The `i`-th child.
    #[must_use]
    pub fn child(&self, t: TermId, i: usize) -> TermId {
        self.node(t).children[i]
    }

    /// The number of children.
    #[must_use]
    pub fn num_children(&self, t: TermId) -> usize {
        self.node(t).children.len()
    }

    /// The integer indices of an indexed term.
    #[must_use]
    pub fn indices(&self, t: TermId) -> &[u64] {
        &self.node(t).indices
    }

    /// The symbol of a constant or variable, if it has one.
    #[must_use]
    pub fn symbol(&self, t: TermId) -> Option<&str> {
        self.node(t).symbol.as_deref()
    }

    /// The value payload of a `Kind::Value` term.
    #[must_use]
    pub fn value(&self, t: TermId) -> Option<&Value> {
        self.node(t).value.as_ref()
    }

    /// True if the term is a value.
    #[must_use]
    pub fn is_value(&self, t: TermId) -> bool {
        self.node(t).kind == Kind::Value
    }

    /// True if the term is a Boolean value with the given payload.
    #[must_use]
    pub fn is_bool_value(&self, t: TermId, b: bool) -> bool {
        matches!(self.value(t), Some(Value::Bool(v)) if *v == b)
    }

    /// The number of live nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /* ---- reference counting ----------------------------------------------- */

    /// Increment the external reference count of a handle.
    pub fn retain(&mut self, t: TermId) {
        self.node_mut(t).ext_refs += 1;
    }

    /// Decrement the external reference count of a handle.
    pub fn release(&mut self, t: TermId) {
        let data = self.node_mut(t);
        debug_assert!(data.ext_refs > 0);
        data.ext_refs = data.ext_refs.saturating_sub(1);
    }

    /// The external reference count of a handle.
    #[must_use]
    pub fn ref_count(&self, t: TermId) -> u64 {
        self.node(t).ext_refs
    }

    /// Reclaim every node with no external references and no live parent.
    ///
    /// Invalidates any `TermId` whose count dropped to zero; callers with
    /// caches keyed on term ids must clear them first.
    pub fn collect_garbage(&mut self) {
        let mut worklist: Vec<TermId> = (0..self.nodes.len())
            .filter_map(|slot| {
                let data = self.nodes[slot].as_ref()?;
                (data.ext_refs == 0 && data.parent_refs == 0).then(|| TermId(slot as u64 + 1))
            })
            .collect();
        while let Some(t) = worklist.pop() {
            let Some(data) = self.nodes[t.slot()].take() else {
                continue;
            };
            let key = match data.kind {
                Kind::Constant | Kind::Variable => None,
                Kind::Value => Some(NodeKey::Value(data.value.clone().expect("value payload"))),
                _ => Some(NodeKey::Op(
                    data.kind,
                    data.children.clone(),
                    data.indices.clone(),
                    data.sort,
                )),
            };
            if let Some(key) = key {
                self.unique.remove(&key);
            }
            self.free.push(t.slot());
            for child in data.children {
                let cd = self.node_mut(child);
                cd.parent_refs -= 1;
                if cd.parent_refs == 0 && cd.ext_refs == 0 {
                    worklist.push(child);
                }
            }
        }
    }

    /* ---- leaf constructors ------------------------------------------------ */

    fn mk_value(&mut self, value: Value) -> TermId {
        let sort = match &value {
            Value::Bool(_) => self.mk_bool_sort(),
            Value::BitVector(bv) => {
                let w = bv.width();
                self.sorts.intern(SortKind::Bv(w))
            }
            Value::FloatingPoint(fp) => {
                let f = fp.format();
                self.sorts.intern(SortKind::Fp(f.exp_bits, f.sig_bits))
            }
            Value::RoundingMode(_) => self.mk_rm_sort(),
        };
        let key = NodeKey::Value(value.clone());
        self.intern(
            key,
            NodeData {
                kind: Kind::Value,
                children: SmallVec::new(),
                indices: SmallVec::new(),
                sort,
                symbol: None,
                value: Some(value),
                ext_refs: 1,
                parent_refs: 0,
            },
        )
    }

    /// The Boolean value `true`.
    pub fn mk_true(&mut self) -> TermId {
        self.mk_value(Value::Bool(true))
    }

    /// The Boolean value `false`.
    pub fn mk_false(&mut self) -> TermId {
        self.mk_value(Value::Bool(false))
    }

    /// A Boolean value.
    pub fn mk_bool_value(&mut self, b: bool) -> TermId {
        self.mk_value(Value::Bool(b))
    }

    /// A bit-vector value term.
    pub fn mk_bv(&mut self, bv: BitVector) -> TermId {
        self.mk_value(Value::BitVector(bv))
    }

    /// The zero value of a bit-vector sort.
    pub fn mk_bv_zero(&mut self, sort: SortId) -> Result<TermId> {
        let w = self.expect_bv_sort(sort)?;
        Ok(self.mk_bv(BitVector::zero(w)))
    }

    /// The one value of a bit-vector sort.
    pub fn mk_bv_one(&mut self, sort: SortId) -> Result<TermId> {
        let w = self.expect_bv_sort(sort)?;
        Ok(self.mk_bv(BitVector::one(w)))
    }

    /// The all-ones value of a bit-vector sort.
    pub fn mk_bv_ones(&mut self, sort: SortId) -> Result<TermId> {
        let w = self.expect_bv_sort(sort)?;
        Ok(self.mk_bv(BitVector::ones(w)))
    }

    /// The minimum signed value of a bit-vector sort.
    pub fn mk_bv_min_signed(&mut self, sort: SortId) -> Result<TermId> {
        let w = self.expect_bv_sort(sort)?;
        Ok(self.mk_bv(BitVector::min_signed(w)))
    }

    /// The maximum signed value of a bit-vector sort.
    pub fn mk_bv_max_signed(&mut self, sort: SortId) -> Result<TermId> {
        let w = self.expect_bv_sort(sort)?;
        Ok(self.mk_bv(BitVector::max_signed(w)))
    }

    /// A bit-vector value parsed from a string in base 2, 10 or 16.
    pub fn mk_bv_value(&mut self, sort: SortId, s: &str, base: u32) -> Result<TermId> {
        let w = self.expect_bv_sort(sort)?;
        let bv = BitVector::from_str(w, s, base)?;
        Ok(self.mk_bv(bv))
    }

    /// A bit-vector value from a `u64`.
    pub fn mk_bv_value_u64(&mut self, sort: SortId, value: u64) -> Result<TermId> {
        let w = self.expect_bv_sort(sort)?;
        Ok(self.mk_bv(BitVector::from_u64(w, value)))
    }

    /// A bit-vector value from an `i64` in two's complement.
    pub fn mk_bv_value_i64(&mut self, sort: SortId, value: i64) -> Result<TermId> {
        let w = self.expect_bv_sort(sort)?;
        Ok(self.mk_bv(BitVector::from_i64(w, value)))
    }

    fn expect_bv_sort(&self, sort: SortId) -> Result<u64> {
        self.bv_width(sort)
            .ok_or_else(|| type_error("expected a bit-vector sort"))
    }

    fn expect_fp_sort(&self, sort: SortId) -> Result<FpFormat> {
        self.fp_format(sort)
            .ok_or_else(|| type_error("expected a floating-point sort"))
    }

    /// A floating-point value term.
    pub fn mk_fp(&mut self, fp: FloatingPoint) -> TermId {
        self.mk_value(Value::FloatingPoint(fp))
    }

    /// Positive zero of a floating-point sort.
    pub fn mk_fp_pos_zero(&mut self, sort: SortId) -> Result<TermId> {
        let fmt = self.expect_fp_sort(sort)?;
        Ok(self.mk_fp(FloatingPoint::pos_zero(fmt)))
    }

    /// Negative zero of a floating-point sort.
    pub fn mk_fp_neg_zero(&mut self, sort: SortId) -> Result<TermId> {
        let fmt = self.expect_fp_sort(sort)?;
        Ok(self.mk_fp(FloatingPoint::neg_zero(fmt)))
    }

    /// Positive infinity of a floating-point sort.
    pub fn mk_fp_pos_inf(&mut self, sort: SortId) -> Result<TermId> {
        let fmt = self.expect_fp_sort(sort)?;
        Ok(self.mk_fp(FloatingPoint::pos_inf(fmt)))
    }

    /// Negative infinity of a floating-point sort.
    pub fn mk_fp_neg_inf(&mut self, sort: SortId) -> Result<TermId> {
        let fmt = self.expect_fp_sort(sort)?;
        Ok(self.mk_fp(FloatingPoint::neg_inf(fmt)))
    }

    /// The canonical NaN of a floating-point sort.
    pub fn mk_fp_nan(&mut self, sort: SortId) -> Result<TermId> {
        let fmt = self.expect_fp_sort(sort)?;
        Ok(self.mk_fp(FloatingPoint::nan(fmt)))
    }

    /// A floating-point value from sign, exponent and significand value
    /// terms.
    pub fn mk_fp_value_from_fields(
        &mut self,
        sign: TermId,
        exp: TermId,
        sig: TermId,
    ) -> Result<TermId> {
        let get = |tm: &Self, t: TermId, name: &str| -> Result<BitVector> {
            tm.value(t)
                .and_then(Value::as_bitvector)
                .cloned()
                .ok_or_else(|| type_error(format!("{name} must be a bit-vector value")))
        };
        let sign = get(self, sign, "sign")?;
        let exp = get(self, exp, "exponent")?;
        let sig = get(self, sig, "significand")?;
        if sign.width() != 1 {
            return Err(type_error("sign must have width 1"));
        }
        if exp.width() < 2 || sig.width() < 1 {
            return Err(type_error("invalid floating-point field widths"));
        }
        Ok(self.mk_fp(FloatingPoint::from_fields(&sign, &exp, &sig)))
    }

    /// The correctly rounded floating-point value of a real literal.
    pub fn mk_fp_value_from_real(
        &mut self,
        sort: SortId,
        rm: RoundingMode,
        real: &str,
    ) -> Result<TermId> {
        let fmt = self.expect_fp_sort(sort)?;
        let fp = FloatingPoint::from_real_str(fmt, rm, real)?;
        Ok(self.mk_fp(fp))
    }

    /// The correctly rounded floating-point value of `num / den`.
    pub fn mk_fp_value_from_rational(
        &mut self,
        sort: SortId,
        rm: RoundingMode,
        num: &str,
        den: &str,
    ) -> Result<TermId> {
        let fmt = self.expect_fp_sort(sort)?;
        let rational = format!("{num}/{den}");
        let fp = FloatingPoint::from_real_str(fmt, rm, &rational)?;
        Ok(self.mk_fp(fp))
    }

    /// A rounding-mode value.
    pub fn mk_rm_value(&mut self, rm: RoundingMode) -> TermId {
        self.mk_value(Value::RoundingMode(rm))
    }

    /// A constant array of the given array sort holding `value` everywhere.
    pub fn mk_const_array(&mut self, sort: SortId, value: TermId) -> Result<TermId> {
        let (_, elem) = self
            .array_sorts(sort)
            .ok_or_else(|| type_error("expected an array sort"))?;
        if self.sort(value) != elem {
            return Err(type_error("constant array value must have the element sort"));
        }
        let children: SmallVec<[TermId; 4]> = smallvec::smallvec![value];
        let key = NodeKey::Op(Kind::ConstArray, children.clone(), SmallVec::new(), sort);
        Ok(self.intern(
            key,
            NodeData {
                kind: Kind::ConstArray,
                children,
                indices: SmallVec::new(),
                sort,
                symbol: None,
                value: None,
                ext_refs: 1,
                parent_refs: 0,
            },
        ))
    }

    /// A fresh uninterpreted constant of the given sort.
    ///
    /// Constants are not hash-consed: every call creates a new symbol.
    pub fn mk_const(&mut self, sort: SortId, symbol: Option<&str>) -> TermId {
        self.insert(NodeData {
            kind: Kind::Constant,
            children: SmallVec::new(),
            indices: SmallVec::new(),
            sort,
            symbol: symbol.map(Into::into),
            value: None,
            ext_refs: 1,
            parent_refs: 0,
        })
    }

    /// A fresh bound variable of the given sort.
    pub fn mk_var(&mut self, sort: SortId, symbol: Option<&str>) -> TermId {
        self.insert(NodeData {
            kind: Kind::Variable,
            children: SmallVec::new(),
            indices: SmallVec::new(),
            sort,
            symbol: symbol.map(Into::into),
            value: None,
            ext_refs: 1,
            parent_refs: 0,
        })
    }

    /* ---- operator constructor --------------------------------------------- */

    /// Construct an operator term. Type inference is total: arity, child
    /// sorts and indices are validated against the kind's signature, and a
    /// failed construction leaves no partial node behind.
    pub fn mk_term(&mut self, kind: Kind, children: &[TermId], indices: &[u64]) -> Result<TermId> {
        if kind.is_leaf() {
            return Err(Error::Usage(format!(
                "{kind:?} terms are built with their dedicated constructors"
            )));
        }
        if kind == Kind::ConstArray {
            return Err(Error::Usage(
                "constant arrays are built with mk_const_array".into(),
            ));
        }
        let sort = self.infer_sort(kind, children, indices)?;
        let children: SmallVec<[TermId; 4]> = children.iter().copied().collect();
        let indices: SmallVec<[u64; 2]> = indices.iter().copied().collect();
        let key = NodeKey::Op(kind, children.clone(), indices.clone(), sort);
        Ok(self.intern(
            key,
            NodeData {
                kind,
                children,
                indices,
                sort,
                symbol: None,
                value: None,
                ext_refs: 1,
                parent_refs: 0,
            },
        ))
    }

    /// Rebuild a term with new children, keeping kind, indices and (for
    /// constant arrays) the original sort.
    pub fn rebuild(&mut self, old: TermId, children: &[TermId]) -> Result<TermId> {
        let kind = self.kind(old);
        if kind.is_leaf() {
            return Ok(old);
        }
        if children == self.children(old) {
            return Ok(old);
        }
        if kind == Kind::ConstArray {
            return self.mk_const_array(self.sort(old), children[0]);
        }
        let indices: SmallVec<[u64; 2]> = self.node(old).indices.clone();
        self.mk_term(kind, children, &indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let y = tm.mk_const(bv8, Some("y"));
        let a = tm.mk_term(Kind::BvAdd, &[x, y], &[]).unwrap();
        let b = tm.mk_term(Kind::BvAdd, &[x, y], &[]).unwrap();
        assert_eq!(a, b);
        let c = tm.mk_term(Kind::BvAdd, &[y, x], &[]).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_values_are_shared() {
        let mut tm = TermManager::new();
        let bv4 = tm.mk_bv_sort(4).unwrap();
        let a = tm.mk_bv_value_u64(bv4, 5).unwrap();
        let b = tm.mk_bv_value(bv4, "101", 2).unwrap();
        assert_eq!(a, b);
        assert_eq!(tm.mk_true(), tm.mk_true());
    }

    #[test]
    fn test_consts_are_fresh() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x1 = tm.mk_const(bv8, Some("x"));
        let x2 = tm.mk_const(bv8, Some("x"));
        assert_ne!(x1, x2);
    }

    #[test]
    fn test_type_inference_rejects_mismatch() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let bv4 = tm.mk_bv_sort(4).unwrap();
        let x = tm.mk_const(bv8, None);
        let y = tm.mk_const(bv4, None);
        assert!(tm.mk_term(Kind::BvAdd, &[x, y], &[]).is_err());
        assert!(tm.mk_term(Kind::BvAdd, &[x], &[]).is_err());
        assert!(tm.mk_term(Kind::And, &[x, y], &[]).is_err());
        // Extract with upper < lower or upper >= width.
        assert!(tm.mk_term(Kind::BvExtract, &[x], &[1, 2]).is_err());
        assert!(tm.mk_term(Kind::BvExtract, &[x], &[8, 0]).is_err());
        assert!(tm.mk_term(Kind::BvExtract, &[x], &[3, 0]).is_ok());
    }

    #[test]
    fn test_sorts_of_operations() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let bool_s = tm.mk_bool_sort();
        let x = tm.mk_const(bv8, None);
        let y = tm.mk_const(bv8, None);
        let cat = tm.mk_term(Kind::BvConcat, &[x, y], &[]).unwrap();
        assert_eq!(tm.bv_width(tm.sort(cat)), Some(16));
        let ult = tm.mk_term(Kind::BvUlt, &[x, y], &[]).unwrap();
        assert_eq!(tm.sort(ult), bool_s);
        let ext = tm.mk_term(Kind::BvZeroExtend, &[x], &[4]).unwrap();
        assert_eq!(tm.bv_width(tm.sort(ext)), Some(12));
        let red = tm.mk_term(Kind::BvRedor, &[x], &[]).unwrap();
        assert_eq!(tm.bv_width(tm.sort(red)), Some(1));
    }

    #[test]
    fn test_apply_typing() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let bv4 = tm.mk_bv_sort(4).unwrap();
        let fun = tm.mk_fun_sort(&[bv8, bv4], bv8).unwrap();
        let f = tm.mk_const(fun, Some("f"));
        let x = tm.mk_const(bv8, None);
        let y = tm.mk_const(bv4, None);
        let app = tm.mk_term(Kind::Apply, &[f, x, y], &[]).unwrap();
        assert_eq!(tm.sort(app), bv8);
        assert!(tm.mk_term(Kind::Apply, &[f, y, x], &[]).is_err());
        assert!(tm.mk_term(Kind::Apply, &[f, x], &[]).is_err());
    }

    #[test]
    fn test_array_typing() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let bv32 = tm.mk_bv_sort(32).unwrap();
        let arr = tm.mk_array_sort(bv8, bv32).unwrap();
        let a = tm.mk_const(arr, Some("a"));
        let i = tm.mk_const(bv8, None);
        let v = tm.mk_const(bv32, None);
        let sel = tm.mk_term(Kind::Select, &[a, i], &[]).unwrap();
        assert_eq!(tm.sort(sel), bv32);
        let st = tm.mk_term(Kind::Store, &[a, i, v], &[]).unwrap();
        assert_eq!(tm.sort(st), arr);
        assert!(tm.mk_term(Kind::Select, &[a, v], &[]).is_err());
    }

    #[test]
    fn test_fp_typing() {
        let mut tm = TermManager::new();
        let f32s = tm.mk_fp_sort(8, 24).unwrap();
        let rm_s = tm.mk_rm_sort();
        let bv32 = tm.mk_bv_sort(32).unwrap();
        let rm = tm.mk_rm_value(RoundingMode::Rne);
        let a = tm.mk_const(f32s, None);
        let b = tm.mk_const(f32s, None);
        let sum = tm.mk_term(Kind::FpAdd, &[rm, a, b], &[]).unwrap();
        assert_eq!(tm.sort(sum), f32s);
        let lt = tm.mk_term(Kind::FpLt, &[a, b], &[]).unwrap();
        assert!(tm.is_bool_sort(tm.sort(lt)));
        let x = tm.mk_const(bv32, None);
        let conv = tm.mk_term(Kind::FpToFpFromBv, &[x], &[8, 24]).unwrap();
        assert_eq!(tm.sort(conv), f32s);
        assert!(tm.mk_term(Kind::FpToFpFromBv, &[x], &[5, 11]).is_err());
        assert!(tm.mk_term(Kind::FpAdd, &[a, a, b], &[]).is_err());
        let _ = rm_s;
    }

    #[test]
    fn test_refcount_and_gc() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let one = tm.mk_bv_value_u64(bv8, 1).unwrap();
        let sum = tm.mk_term(Kind::BvAdd, &[x, one], &[]).unwrap();
        let live = tm.num_nodes();
        tm.release(sum);
        tm.collect_garbage();
        assert_eq!(tm.num_nodes(), live - 1);
        // Children stay alive through their own external references.
        assert_eq!(tm.kind(x), Kind::Constant);
        assert_eq!(tm.kind(one), Kind::Value);
        // Rebuilding after collection yields a fresh but equal-structure
        // node.
        let sum2 = tm.mk_term(Kind::BvAdd, &[x, one], &[]).unwrap();
        assert_eq!(tm.num_nodes(), live);
        let sum3 = tm.mk_term(Kind::BvAdd, &[x, one], &[]).unwrap();
        assert_eq!(sum2, sum3);
    }

    #[test]
    fn test_gc_keeps_shared_children() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, None);
        let neg = tm.mk_term(Kind::BvNeg, &[x], &[]).unwrap();
        let add = tm.mk_term(Kind::BvAdd, &[neg, neg], &[]).unwrap();
        tm.release(neg);
        tm.collect_garbage();
        // neg is still referenced by add.
        assert_eq!(tm.kind(neg), Kind::BvNeg);
        tm.release(add);
        tm.collect_garbage();
        assert_eq!(tm.kind(x), Kind::Constant);
    }
}
