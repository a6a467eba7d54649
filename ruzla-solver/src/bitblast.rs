//! Bit-Blasting Bit-Vector Terms to AIG Circuits.
//!
//! Walks the (preprocessed, word-blasted) term DAG and maps every Boolean
//! term to a single [`AigRef`] and every bit-vector term to an LSB-first
//! vector of refs. Uninterpreted leaves (constants, function applications,
//! array selects, array/function equalities) become fresh variables and
//! are recorded for the congruence engine. Results are cached for the
//! lifetime of the engine, so a term blasts to the same circuit in every
//! round.

use crate::aig::{Aig, AigRef};
use ruzla_core::error::{internal_error, Result};
use ruzla_core::sort::SortKind;
use ruzla_core::{BitVector, Kind, TermId, TermManager, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// The bit-blaster: term-to-circuit maps over an owned AIG.
#[derive(Debug, Default)]
pub struct BitBlaster {
    /// The underlying and-inverter graph.
    pub aig: Aig,
    bool_map: FxHashMap<TermId, AigRef>,
    bits_map: FxHashMap<TermId, Vec<AigRef>>,
    /// Theory leaves encountered during blasting, in first-seen order.
    registered: Vec<TermId>,
    registered_set: FxHashSet<TermId>,
}

type Bits = Vec<AigRef>;

impl BitBlaster {
    /// Create an empty blaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the theory leaves discovered since the last call.
    pub fn take_registered(&mut self) -> Vec<TermId> {
        std::mem::take(&mut self.registered)
    }

    /// The cached AIG reference of a Boolean term, if it was blasted.
    #[must_use]
    pub fn bool_ref(&self, t: TermId) -> Option<AigRef> {
        self.bool_map.get(&t).copied()
    }

    /// The cached bit vector of a BV term, if it was blasted.
    #[must_use]
    pub fn bits(&self, t: TermId) -> Option<&[AigRef]> {
        self.bits_map.get(&t).map(Vec::as_slice)
    }

    fn register(&mut self, t: TermId) {
        if self.registered_set.insert(t) {
            self.registered.push(t);
        }
    }

    /// Blast a Boolean term to a single AIG reference.
    pub fn blast_bool(&mut self, tm: &TermManager, term: TermId) -> Result<AigRef> {
        self.blast(tm, term)?;
        self.bool_map
            .get(&term)
            .copied()
            .ok_or_else(|| internal_error("expected a Boolean term to blast"))
    }

    /// Blast every reachable subterm of `term`.
    fn blast(&mut self, tm: &TermManager, term: TermId) -> Result<()> {
        let mut stack: Vec<(TermId, bool)> = vec![(term, false)];
        while let Some((cur, expanded)) = stack.pop() {
            if self.bool_map.contains_key(&cur) || self.bits_map.contains_key(&cur) {
                continue;
            }
            if self.is_leaf(tm, cur) {
                self.blast_leaf(tm, cur)?;
                continue;
            }
            if !expanded {
                stack.push((cur, true));
                for &child in tm.children(cur) {
                    // Function symbols and array bases carry no bits
                    // themselves (unless they are store chains a select
                    // reads through, which the leaf path handles).
                    if self.carries_bits(tm, child) {
                        stack.push((child, false));
                    }
                }
                continue;
            }
            self.blast_node(tm, cur)?;
        }
        Ok(())
    }

    /// Theory leaves get fresh variables and congruence registration.
    fn is_leaf(&self, tm: &TermManager, t: TermId) -> bool {
        match tm.kind(t) {
            Kind::Constant | Kind::Value => true,
            Kind::Apply | Kind::Select => true,
            Kind::Equal => {
                let s = tm.sort(tm.child(t, 0));
                matches!(tm.sort_kind(s), SortKind::Array(..) | SortKind::Fun(_))
            }
            _ => false,
        }
    }

    fn carries_bits(&self, tm: &TermManager, t: TermId) -> bool {
        matches!(
            tm.sort_kind(tm.sort(t)),
            SortKind::Bool | SortKind::Bv(_)
        )
    }

    fn blast_leaf(&mut self, tm: &TermManager, t: TermId) -> Result<()> {
        match tm.kind(t) {
            Kind::Value => match tm.value(t).expect("value payload") {
                Value::Bool(b) => {
                    let r = if *b { AigRef::TRUE } else { AigRef::FALSE };
                    self.bool_map.insert(t, r);
                }
                Value::BitVector(bv) => {
                    let bits = self.const_bits(bv);
                    self.bits_map.insert(t, bits);
                }
                _ => {
                    return Err(internal_error(
                        "floating-point value reached the bit-blaster",
                    ))
                }
            },
            Kind::Constant | Kind::Apply | Kind::Select | Kind::Equal => {
                // Select and apply arguments still need bits for the
                // congruence engine's model probing.
                if matches!(tm.kind(t), Kind::Apply) {
                    for &arg in &tm.children(t)[1..] {
                        if self.carries_bits(tm, arg) {
                            self.blast(tm, arg)?;
                        }
                    }
                }
                if matches!(tm.kind(t), Kind::Select) {
                    let idx = tm.child(t, 1);
                    if self.carries_bits(tm, idx) {
                        self.blast(tm, idx)?;
                    }
                    // Store chains under the select keep their indices and
                    // values probeable for the lazy write axioms.
                    let mut arr = tm.child(t, 0);
                    while tm.kind(arr) == Kind::Store {
                        let widx = tm.child(arr, 1);
                        let wval = tm.child(arr, 2);
                        if self.carries_bits(tm, widx) {
                            self.blast(tm, widx)?;
                        }
                        if self.carries_bits(tm, wval) {
                            self.blast(tm, wval)?;
                        }
                        arr = tm.child(arr, 0);
                    }
                    // A constant-array base exposes its default value.
                    if tm.kind(arr) == Kind::ConstArray {
                        let dflt = tm.child(arr, 0);
                        if self.carries_bits(tm, dflt) {
                            self.blast(tm, dflt)?;
                        }
                    }
                }
                match tm.sort_kind(tm.sort(t)) {
                    SortKind::Bool => {
                        let v = self.aig.mk_var();
                        self.bool_map.insert(t, v);
                        self.register(t);
                    }
                    SortKind::Bv(w) => {
                        let bits: Bits = (0..*w).map(|_| self.aig.mk_var()).collect();
                        self.bits_map.insert(t, bits);
                        self.register(t);
                    }
                    // Array- and function-sorted leaves carry no bits;
                    // they exist for the congruence engine only.
                    _ => {
                        self.register(t);
                    }
                }
            }
            _ => return Err(internal_error("unexpected leaf kind")),
        }
        Ok(())
    }

    fn const_bits(&mut self, bv: &BitVector) -> Bits {
        (0..bv.width())
            .map(|i| {
                if bv.bit(i) {
                    AigRef::TRUE
                } else {
                    AigRef::FALSE
                }
            })
            .collect()
    }

    fn get_bits(&self, t: TermId) -> Bits {
        self.bits_map[&t].clone()
    }

    fn get_bool(&self, t: TermId) -> AigRef {
        self.bool_map[&t]
    }

    fn blast_node(&mut self, tm: &TermManager, t: TermId) -> Result<()> {
        let kind = tm.kind(t);
        let children: SmallVec<[TermId; 4]> = tm.children(t).iter().copied().collect();
        match kind {
            /* boolean structure */
            Kind::And | Kind::Or => {
                let mut acc = if kind == Kind::And {
                    AigRef::TRUE
                } else {
                    AigRef::FALSE
                };
                for &c in &children {
                    let r = self.get_bool(c);
                    acc = if kind == Kind::And {
                        self.aig.mk_and(acc, r)
                    } else {
                        self.aig.mk_or(acc, r)
                    };
                }
                self.bool_map.insert(t, acc);
            }
            Kind::Not => {
                let r = self.get_bool(children[0]);
                self.bool_map.insert(t, r.not());
            }
            Kind::Implies => {
                let a = self.get_bool(children[0]);
                let b = self.get_bool(children[1]);
                let r = self.aig.mk_or(a.not(), b);
                self.bool_map.insert(t, r);
            }
            Kind::Iff => {
                let a = self.get_bool(children[0]);
                let b = self.get_bool(children[1]);
                let r = self.aig.mk_iff(a, b);
                self.bool_map.insert(t, r);
            }
            Kind::Xor => {
                let a = self.get_bool(children[0]);
                let b = self.get_bool(children[1]);
                let r = self.aig.mk_xor(a, b);
                self.bool_map.insert(t, r);
            }
            Kind::Equal => {
                let s = tm.sort(children[0]);
                let r = match tm.sort_kind(s) {
                    SortKind::Bool => {
                        let a = self.get_bool(children[0]);
                        let b = self.get_bool(children[1]);
                        self.aig.mk_iff(a, b)
                    }
                    SortKind::Bv(_) => {
                        let a = self.get_bits(children[0]);
                        let b = self.get_bits(children[1]);
                        self.eq_bits(&a, &b)
                    }
                    _ => return Err(internal_error("unhandled equality sort")),
                };
                self.bool_map.insert(t, r);
            }
            Kind::Distinct => {
                // Pairwise disequality (the rewriter expands this at
                // levels >= 1; level 0 lands here).
                let mut acc = AigRef::TRUE;
                for (i, &a) in children.iter().enumerate() {
                    for &b in &children[i + 1..] {
                        let eq = match tm.sort_kind(tm.sort(a)) {
                            SortKind::Bool => {
                                let x = self.get_bool(a);
                                let y = self.get_bool(b);
                                self.aig.mk_iff(x, y)
                            }
                            SortKind::Bv(_) => {
                                let x = self.get_bits(a);
                                let y = self.get_bits(b);
                                self.eq_bits(&x, &y)
                            }
                            _ => return Err(internal_error("unhandled distinct sort")),
                        };
                        acc = self.aig.mk_and(acc, eq.not());
                    }
                }
                self.bool_map.insert(t, acc);
            }
            Kind::Ite => {
                let c = self.get_bool(children[0]);
                match tm.sort_kind(tm.sort(t)) {
                    SortKind::Bool => {
                        let a = self.get_bool(children[1]);
                        let b = self.get_bool(children[2]);
                        let r = self.aig.mk_ite(c, a, b);
                        self.bool_map.insert(t, r);
                    }
                    SortKind::Bv(_) => {
                        let a = self.get_bits(children[1]);
                        let b = self.get_bits(children[2]);
                        let bits: Bits = a
                            .iter()
                            .zip(&b)
                            .map(|(&x, &y)| self.aig.mk_ite(c, x, y))
                            .collect();
                        self.bits_map.insert(t, bits);
                    }
                    _ => return Err(internal_error("unhandled ite sort")),
                }
            }

            /* bit-vector bitwise */
            Kind::BvNot => {
                let a = self.get_bits(children[0]);
                let bits: Bits = a.iter().map(|r| r.not()).collect();
                self.bits_map.insert(t, bits);
            }
            Kind::BvAnd | Kind::BvOr | Kind::BvXor | Kind::BvNand | Kind::BvNor
            | Kind::BvXnor => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let bits: Bits = a
                    .iter()
                    .zip(&b)
                    .map(|(&x, &y)| match kind {
                        Kind::BvAnd => self.aig.mk_and(x, y),
                        Kind::BvOr => self.aig.mk_or(x, y),
                        Kind::BvXor => self.aig.mk_xor(x, y),
                        Kind::BvNand => self.aig.mk_and(x, y).not(),
                        Kind::BvNor => self.aig.mk_or(x, y).not(),
                        _ => self.aig.mk_xor(x, y).not(),
                    })
                    .collect();
                self.bits_map.insert(t, bits);
            }

            /* arithmetic */
            Kind::BvAdd => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let (bits, _) = self.adder(&a, &b, AigRef::FALSE);
                self.bits_map.insert(t, bits);
            }
            Kind::BvSub => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let nb: Bits = b.iter().map(|r| r.not()).collect();
                let (bits, _) = self.adder(&a, &nb, AigRef::TRUE);
                self.bits_map.insert(t, bits);
            }
            Kind::BvNeg => {
                let a = self.get_bits(children[0]);
                let bits = self.negate(&a);
                self.bits_map.insert(t, bits);
            }
            Kind::BvInc | Kind::BvDec => {
                let a = self.get_bits(children[0]);
                let one: Bits = std::iter::once(AigRef::TRUE)
                    .chain(std::iter::repeat(AigRef::FALSE))
                    .take(a.len())
                    .collect();
                let bits = if kind == Kind::BvInc {
                    self.adder(&a, &one, AigRef::FALSE).0
                } else {
                    let none: Bits = one.iter().map(|r| r.not()).collect();
                    self.adder(&a, &none, AigRef::TRUE).0
                };
                self.bits_map.insert(t, bits);
            }
            Kind::BvMul => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let bits = self.multiplier(&a, &b);
                self.bits_map.insert(t, bits);
            }
            Kind::BvUdiv | Kind::BvUrem => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let (q, r) = self.divider(&a, &b);
                let bits = if kind == Kind::BvUdiv { q } else { r };
                self.bits_map.insert(t, bits);
            }
            Kind::BvSdiv | Kind::BvSrem | Kind::BvSmod => {
                let bits = self.signed_division(kind, children[0], children[1]);
                self.bits_map.insert(t, bits);
            }

            /* shifts and rotates */
            Kind::BvShl | Kind::BvShr | Kind::BvAshr => {
                let a = self.get_bits(children[0]);
                let sh = self.get_bits(children[1]);
                let fill = match kind {
                    Kind::BvAshr => *a.last().expect("nonempty"),
                    _ => AigRef::FALSE,
                };
                let left = kind == Kind::BvShl;
                let bits = self.barrel_shift(&a, &sh, left, fill);
                self.bits_map.insert(t, bits);
            }
            Kind::BvRol | Kind::BvRor => {
                let a = self.get_bits(children[0]);
                let sh = self.get_bits(children[1]);
                let w = a.len() as u64;
                let wbits = self.const_bits(&BitVector::from_u64(w, w));
                let (_, amount) = self.divider(&sh, &wbits);
                let bits = self.barrel_rotate(&a, &amount, kind == Kind::BvRol);
                self.bits_map.insert(t, bits);
            }
            Kind::BvRoli | Kind::BvRori => {
                let a = self.get_bits(children[0]);
                let w = a.len() as u64;
                let n = (tm.indices(t)[0] % w) as usize;
                let n = if kind == Kind::BvRoli {
                    n
                } else {
                    (w as usize - n) % w as usize
                };
                // Left-rotate by n: bit i of the result is bit (i - n) mod w.
                let bits: Bits = (0..w as usize)
                    .map(|i| a[(i + w as usize - n) % w as usize])
                    .collect();
                self.bits_map.insert(t, bits);
            }

            /* structural */
            Kind::BvConcat => {
                let hi = self.get_bits(children[0]);
                let lo = self.get_bits(children[1]);
                let mut bits = lo;
                bits.extend(hi);
                self.bits_map.insert(t, bits);
            }
            Kind::BvExtract => {
                let a = self.get_bits(children[0]);
                let upper = tm.indices(t)[0] as usize;
                let lower = tm.indices(t)[1] as usize;
                let bits: Bits = a[lower..=upper].to_vec();
                self.bits_map.insert(t, bits);
            }
            Kind::BvRepeat => {
                let a = self.get_bits(children[0]);
                let n = tm.indices(t)[0] as usize;
                let bits: Bits = a.iter().copied().cycle().take(a.len() * n).collect();
                self.bits_map.insert(t, bits);
            }
            Kind::BvZeroExtend | Kind::BvSignExtend => {
                let a = self.get_bits(children[0]);
                let n = tm.indices(t)[0] as usize;
                let fill = if kind == Kind::BvZeroExtend {
                    AigRef::FALSE
                } else {
                    *a.last().expect("nonempty")
                };
                let mut bits = a;
                bits.extend(std::iter::repeat(fill).take(n));
                self.bits_map.insert(t, bits);
            }

            /* reductions */
            Kind::BvRedand | Kind::BvRedor | Kind::BvRedxor => {
                let a = self.get_bits(children[0]);
                let mut acc = match kind {
                    Kind::BvRedand => AigRef::TRUE,
                    _ => AigRef::FALSE,
                };
                for &bit in &a {
                    acc = match kind {
                        Kind::BvRedand => self.aig.mk_and(acc, bit),
                        Kind::BvRedor => self.aig.mk_or(acc, bit),
                        _ => self.aig.mk_xor(acc, bit),
                    };
                }
                self.bits_map.insert(t, vec![acc]);
            }
            Kind::BvComp => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let eq = self.eq_bits(&a, &b);
                self.bits_map.insert(t, vec![eq]);
            }

            /* predicates */
            Kind::BvUlt | Kind::BvUle | Kind::BvUgt | Kind::BvUge => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let r = match kind {
                    Kind::BvUlt => self.ult_bits(&a, &b),
                    Kind::BvUle => self.ult_bits(&b, &a).not(),
                    Kind::BvUgt => self.ult_bits(&b, &a),
                    _ => self.ult_bits(&a, &b).not(),
                };
                self.bool_map.insert(t, r);
            }
            Kind::BvSlt | Kind::BvSle | Kind::BvSgt | Kind::BvSge => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let r = match kind {
                    Kind::BvSlt => self.slt_bits(&a, &b),
                    Kind::BvSle => self.slt_bits(&b, &a).not(),
                    Kind::BvSgt => self.slt_bits(&b, &a),
                    _ => self.slt_bits(&a, &b).not(),
                };
                self.bool_map.insert(t, r);
            }
            Kind::BvUaddo => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let (_, carry) = self.adder(&a, &b, AigRef::FALSE);
                self.bool_map.insert(t, carry);
            }
            Kind::BvUsubo => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let r = self.ult_bits(&a, &b);
                self.bool_map.insert(t, r);
            }
            Kind::BvSaddo | Kind::BvSsubo => {
                let a = self.get_bits(children[0]);
                let b0 = self.get_bits(children[1]);
                let subtract = kind == Kind::BvSsubo;
                let b: Bits = if subtract {
                    b0.iter().map(|r| r.not()).collect()
                } else {
                    b0.clone()
                };
                let cin = if subtract { AigRef::TRUE } else { AigRef::FALSE };
                let (sum, _) = self.adder(&a, &b, cin);
                let sa = *a.last().expect("nonempty");
                let sb = *b.last().expect("nonempty");
                let sr = *sum.last().expect("nonempty");
                // Overflow: operands agree in sign (after negation for
                // subtraction) and the result sign flips.
                let same = self.aig.mk_iff(sa, sb);
                let flip = self.aig.mk_xor(sa, sr);
                let r = self.aig.mk_and(same, flip);
                self.bool_map.insert(t, r);
            }
            Kind::BvUmulo => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let w = a.len();
                let az = self.extend(&a, w, AigRef::FALSE);
                let bz = self.extend(&b, w, AigRef::FALSE);
                let prod = self.multiplier(&az, &bz);
                let mut high = AigRef::FALSE;
                for &bit in &prod[w..] {
                    high = self.aig.mk_or(high, bit);
                }
                self.bool_map.insert(t, high);
            }
            Kind::BvSmulo => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                let w = a.len();
                let sa = *a.last().expect("nonempty");
                let sb = *b.last().expect("nonempty");
                let ax = self.extend(&a, w, sa);
                let bx = self.extend(&b, w, sb);
                let prod = self.multiplier(&ax, &bx);
                // Overflow unless the top w + 1 bits are a sign fill.
                let sign = prod[w - 1];
                let mut ok = AigRef::TRUE;
                for &bit in &prod[w..] {
                    let same = self.aig.mk_iff(bit, sign);
                    ok = self.aig.mk_and(ok, same);
                }
                self.bool_map.insert(t, ok.not());
            }
            Kind::BvSdivo => {
                let a = self.get_bits(children[0]);
                let b = self.get_bits(children[1]);
                // min_signed / -1 is the only overflow.
                let mut a_min = *a.last().expect("nonempty");
                for &bit in &a[..a.len() - 1] {
                    a_min = self.aig.mk_and(a_min, bit.not());
                }
                let mut b_ones = AigRef::TRUE;
                for &bit in &b {
                    b_ones = self.aig.mk_and(b_ones, bit);
                }
                let r = self.aig.mk_and(a_min, b_ones);
                self.bool_map.insert(t, r);
            }

            _ => {
                return Err(internal_error(format!(
                    "kind {kind:?} reached the bit-blaster"
                )))
            }
        }
        Ok(())
    }

    /* ---- circuit building blocks ------------------------------------------ */

    fn eq_bits(&mut self, a: &[AigRef], b: &[AigRef]) -> AigRef {
        let mut acc = AigRef::TRUE;
        for (&x, &y) in a.iter().zip(b) {
            let bit = self.aig.mk_iff(x, y);
            acc = self.aig.mk_and(acc, bit);
        }
        acc
    }

    fn adder(&mut self, a: &[AigRef], b: &[AigRef], carry_in: AigRef) -> (Bits, AigRef) {
        let mut carry = carry_in;
        let mut out = Vec::with_capacity(a.len());
        for (&x, &y) in a.iter().zip(b) {
            let xy = self.aig.mk_xor(x, y);
            let sum = self.aig.mk_xor(xy, carry);
            let c1 = self.aig.mk_and(x, y);
            let c2 = self.aig.mk_and(xy, carry);
            carry = self.aig.mk_or(c1, c2);
            out.push(sum);
        }
        (out, carry)
    }

    fn negate(&mut self, a: &[AigRef]) -> Bits {
        let na: Bits = a.iter().map(|r| r.not()).collect();
        let one: Bits = std::iter::once(AigRef::TRUE)
            .chain(std::iter::repeat(AigRef::FALSE))
            .take(a.len())
            .collect();
        self.adder(&na, &one, AigRef::FALSE).0
    }

    fn extend(&self, a: &[AigRef], n: usize, fill: AigRef) -> Bits {
        let mut out = a.to_vec();
        out.extend(std::iter::repeat(fill).take(n));
        out
    }

    fn multiplier(&mut self, a: &[AigRef], b: &[AigRef]) -> Bits {
        let w = a.len();
        let mut acc: Bits = vec![AigRef::FALSE; w];
        for (i, &bi) in b.iter().enumerate() {
            // Row i: (a & b[i]) << i, accumulated with a ripple adder on
            // the live suffix.
            let row: Bits = a[..w - i].iter().map(|&x| self.aig.mk_and(x, bi)).collect();
            let (sum, _) = self.adder(&acc[i..].to_vec(), &row, AigRef::FALSE);
            acc.splice(i.., sum);
        }
        acc
    }

    fn ult_bits(&mut self, a: &[AigRef], b: &[AigRef]) -> AigRef {
        // MSB-down comparison chain.
        let mut lt = AigRef::FALSE;
        for (&x, &y) in a.iter().zip(b) {
            // From LSB up: lt' = (x < y) | (x == y) & lt
            let xltx = self.aig.mk_and(x.not(), y);
            let eq = self.aig.mk_iff(x, y);
            let keep = self.aig.mk_and(eq, lt);
            lt = self.aig.mk_or(xltx, keep);
        }
        lt
    }

    fn slt_bits(&mut self, a: &[AigRef], b: &[AigRef]) -> AigRef {
        let w = a.len();
        let sa = a[w - 1];
        let sb = b[w - 1];
        let mag = self.ult_bits(&a[..w - 1], &b[..w - 1]);
        if w == 1 {
            // 1-bit signed: 1 (= -1) < 0.
            return self.aig.mk_and(sa, sb.not());
        }
        // a < b: a negative and b not, or equal signs and magnitude less.
        let neg_pos = self.aig.mk_and(sa, sb.not());
        let same = self.aig.mk_iff(sa, sb);
        let same_lt = self.aig.mk_and(same, mag);
        self.aig.mk_or(neg_pos, same_lt)
    }

    fn barrel_shift(&mut self, a: &[AigRef], sh: &[AigRef], left: bool, fill: AigRef) -> Bits {
        let w = a.len();
        let stages = usize::BITS as usize - (w - 1).leading_zeros() as usize;
        let stages = if w == 1 { 1 } else { stages };
        let mut cur = a.to_vec();
        for s in 0..stages.min(sh.len()) {
            let amount = 1usize << s;
            let cond = sh[s];
            let shifted: Bits = (0..w)
                .map(|i| {
                    let src = if left {
                        i.checked_sub(amount)
                    } else if i + amount < w {
                        Some(i + amount)
                    } else {
                        None
                    };
                    match src {
                        Some(j) => cur[j],
                        None => fill,
                    }
                })
                .collect();
            cur = cur
                .iter()
                .zip(&shifted)
                .map(|(&keep, &shift)| self.aig.mk_ite(cond, shift, keep))
                .collect();
        }
        // Any set bit beyond the covered stages shifts everything out.
        if sh.len() > stages {
            let mut over = AigRef::FALSE;
            for &bit in &sh[stages.min(sh.len())..] {
                over = self.aig.mk_or(over, bit);
            }
            cur = cur
                .iter()
                .map(|&bit| self.aig.mk_ite(over, fill, bit))
                .collect();
        }
        // Shift amounts >= width within the staged range also overflow.
        let wbits = self.const_bits(&BitVector::from_u64(sh.len() as u64, w as u64));
        if w as u64 <= BitVector::ones(sh.len() as u64).to_u64().unwrap_or(u64::MAX) {
            let ge_w = self.ult_bits(sh, &wbits).not();
            cur = cur
                .iter()
                .map(|&bit| self.aig.mk_ite(ge_w, fill, bit))
                .collect();
        }
        cur
    }

    fn barrel_rotate(&mut self, a: &[AigRef], amount: &[AigRef], left: bool) -> Bits {
        // `amount` is already reduced modulo the width.
        let w = a.len();
        let stages = usize::BITS as usize - (w.max(2) - 1).leading_zeros() as usize;
        let mut cur = a.to_vec();
        for s in 0..stages.min(amount.len()) {
            let rot = 1usize << s;
            let cond = amount[s];
            let rotated: Bits = (0..w)
                .map(|i| {
                    let j = if left {
                        (i + w - rot % w) % w
                    } else {
                        (i + rot) % w
                    };
                    cur[j]
                })
                .collect();
            cur = cur
                .iter()
                .zip(&rotated)
                .map(|(&keep, &shift)| self.aig.mk_ite(cond, shift, keep))
                .collect();
        }
        cur
    }

    fn divider(&mut self, a: &[AigRef], b: &[AigRef]) -> (Bits, Bits) {
        // Restoring division, MSB first. With a zero divisor the subtract
        // never fires, yielding the SMT-LIB all-ones quotient and the
        // dividend as remainder.
        let w = a.len();
        let bx = self.extend(b, 1, AigRef::FALSE);
        let mut rem: Bits = vec![AigRef::FALSE; w + 1];
        let mut quot: Bits = vec![AigRef::FALSE; w];
        for i in (0..w).rev() {
            // rem = (rem << 1) | a[i]
            rem.pop();
            rem.insert(0, a[i]);
            let nb: Bits = bx.iter().map(|r| r.not()).collect();
            let (diff, carry) = self.adder(&rem, &nb, AigRef::TRUE);
            // Carry out means rem >= b; a zero divisor always carries,
            // which produces the all-ones quotient.
            let take = carry;
            quot[i] = take;
            rem = rem
                .iter()
                .zip(&diff)
                .map(|(&keep, &sub)| self.aig.mk_ite(take, sub, keep))
                .collect();
        }
        (quot, rem[..w].to_vec())
    }

    fn signed_division(&mut self, kind: Kind, ta: TermId, tb: TermId) -> Bits {
        let a = self.get_bits(ta);
        let b = self.get_bits(tb);
        let w = a.len();
        let sa = a[w - 1];
        let sb = b[w - 1];
        let na = self.negate(&a);
        let nb = self.negate(&b);
        let abs_a: Bits = a
            .iter()
            .zip(&na)
            .map(|(&x, &nx)| self.aig.mk_ite(sa, nx, x))
            .collect();
        let abs_b: Bits = b
            .iter()
            .zip(&nb)
            .map(|(&x, &nx)| self.aig.mk_ite(sb, nx, x))
            .collect();
        let (q, r) = self.divider(&abs_a, &abs_b);
        match kind {
            Kind::BvSdiv => {
                // Quotient negates when the signs differ.
                let diff = self.aig.mk_xor(sa, sb);
                let nq = self.negate(&q);
                q.iter()
                    .zip(&nq)
                    .map(|(&x, &nx)| self.aig.mk_ite(diff, nx, x))
                    .collect()
            }
            Kind::BvSrem => {
                // Remainder takes the dividend's sign.
                let nr = self.negate(&r);
                r.iter()
                    .zip(&nr)
                    .map(|(&x, &nx)| self.aig.mk_ite(sa, nx, x))
                    .collect()
            }
            _ => {
                // smod: remainder takes the divisor's sign; nonzero
                // remainders with differing signs add the divisor.
                let srem: Bits = {
                    let nr = self.negate(&r);
                    r.iter()
                        .zip(&nr)
                        .map(|(&x, &nx)| self.aig.mk_ite(sa, nx, x))
                        .collect()
                };
                let mut rem_zero = AigRef::TRUE;
                for &bit in &srem {
                    rem_zero = self.aig.mk_and(rem_zero, bit.not());
                }
                let signs_differ = self.aig.mk_xor(sa, sb);
                let add = self.aig.mk_and(signs_differ, rem_zero.not());
                let (adjusted, _) = self.adder(&srem, &b, AigRef::FALSE);
                srem.iter()
                    .zip(&adjusted)
                    .map(|(&x, &adj)| self.aig.mk_ite(add, adj, x))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruzla_sat::{Cdcl, SatResult, SatSolver};

    /// Blast `term`, assert it, and solve.
    fn solve_bool(tm: &TermManager, term: TermId) -> SatResult {
        let mut bb = BitBlaster::new();
        let mut sat = Cdcl::new();
        let r = bb.blast_bool(tm, term).unwrap();
        let l = bb.aig.lit(r, &mut sat);
        sat.add_clause(&[l]);
        sat.solve()
    }

    /// Exhaustive equivalence check of a binary BV operation against its
    /// concrete semantics, via UNSAT of `op(a, b) != value`.
    fn check_binop_exhaustive(
        width: u64,
        kind: Kind,
        reference: impl Fn(&BitVector, &BitVector) -> BitVector,
    ) {
        let mut tm = TermManager::new();
        let sort = tm.mk_bv_sort(width).unwrap();
        let max = 1u64 << width;
        for av in 0..max {
            for bv in 0..max {
                let a = tm.mk_bv_value_u64(sort, av).unwrap();
                let b = tm.mk_bv_value_u64(sort, bv).unwrap();
                let op = tm.mk_term(kind, &[a, b], &[]).unwrap();
                let want = reference(
                    &BitVector::from_u64(width, av),
                    &BitVector::from_u64(width, bv),
                );
                let wv = tm.mk_bv(want.clone());
                let eq = tm.mk_term(Kind::Equal, &[op, wv], &[]).unwrap();
                let ne = tm.mk_term(Kind::Not, &[eq], &[]).unwrap();
                assert_eq!(
                    solve_bool(&tm, ne),
                    SatResult::Unsat,
                    "{kind:?}({av}, {bv}) should equal {want:?}"
                );
            }
        }
    }

    #[test]
    fn test_add_circuit() {
        check_binop_exhaustive(3, Kind::BvAdd, |a, b| a.add(b));
    }

    #[test]
    fn test_sub_circuit() {
        check_binop_exhaustive(3, Kind::BvSub, |a, b| a.sub(b));
    }

    #[test]
    fn test_mul_circuit() {
        check_binop_exhaustive(3, Kind::BvMul, |a, b| a.mul(b));
    }

    #[test]
    fn test_udiv_circuit() {
        check_binop_exhaustive(3, Kind::BvUdiv, |a, b| a.udiv(b));
    }

    #[test]
    fn test_urem_circuit() {
        check_binop_exhaustive(3, Kind::BvUrem, |a, b| a.urem(b));
    }

    #[test]
    fn test_sdiv_circuit() {
        check_binop_exhaustive(3, Kind::BvSdiv, |a, b| a.sdiv(b));
    }

    #[test]
    fn test_srem_circuit() {
        check_binop_exhaustive(3, Kind::BvSrem, |a, b| a.srem(b));
    }

    #[test]
    fn test_smod_circuit() {
        check_binop_exhaustive(3, Kind::BvSmod, |a, b| a.smod(b));
    }

    #[test]
    fn test_shift_circuits() {
        check_binop_exhaustive(3, Kind::BvShl, |a, b| a.shl(b));
        check_binop_exhaustive(3, Kind::BvShr, |a, b| a.shr(b));
        check_binop_exhaustive(3, Kind::BvAshr, |a, b| a.ashr(b));
    }

    #[test]
    fn test_rotate_circuits() {
        check_binop_exhaustive(3, Kind::BvRol, |a, b| a.rol(b));
        check_binop_exhaustive(3, Kind::BvRor, |a, b| a.ror(b));
    }

    #[test]
    fn test_width_one_boundary() {
        check_binop_exhaustive(1, Kind::BvAdd, |a, b| a.add(b));
        check_binop_exhaustive(1, Kind::BvMul, |a, b| a.mul(b));
        check_binop_exhaustive(1, Kind::BvUdiv, |a, b| a.udiv(b));
    }

    fn check_pred_exhaustive(
        width: u64,
        kind: Kind,
        reference: impl Fn(&BitVector, &BitVector) -> bool,
    ) {
        let mut tm = TermManager::new();
        let sort = tm.mk_bv_sort(width).unwrap();
        let max = 1u64 << width;
        for av in 0..max {
            for bv in 0..max {
                let a = tm.mk_bv_value_u64(sort, av).unwrap();
                let b = tm.mk_bv_value_u64(sort, bv).unwrap();
                let op = tm.mk_term(kind, &[a, b], &[]).unwrap();
                let want = reference(
                    &BitVector::from_u64(width, av),
                    &BitVector::from_u64(width, bv),
                );
                let phrased = if want {
                    tm.mk_term(Kind::Not, &[op], &[]).unwrap()
                } else {
                    op
                };
                assert_eq!(
                    solve_bool(&tm, phrased),
                    SatResult::Unsat,
                    "{kind:?}({av}, {bv}) should be {want}"
                );
            }
        }
    }

    #[test]
    fn test_comparison_circuits() {
        check_pred_exhaustive(3, Kind::BvUlt, |a, b| a.ult(b));
        check_pred_exhaustive(3, Kind::BvSlt, |a, b| a.slt(b));
        check_pred_exhaustive(3, Kind::BvUle, |a, b| a.ule(b));
        check_pred_exhaustive(3, Kind::BvSle, |a, b| a.sle(b));
    }

    #[test]
    fn test_overflow_circuits() {
        check_pred_exhaustive(3, Kind::BvUaddo, |a, b| a.uaddo(b));
        check_pred_exhaustive(3, Kind::BvSaddo, |a, b| a.saddo(b));
        check_pred_exhaustive(3, Kind::BvUsubo, |a, b| a.usubo(b));
        check_pred_exhaustive(3, Kind::BvSsubo, |a, b| a.ssubo(b));
        check_pred_exhaustive(3, Kind::BvUmulo, |a, b| a.umulo(b));
        check_pred_exhaustive(3, Kind::BvSmulo, |a, b| a.smulo(b));
        check_pred_exhaustive(3, Kind::BvSdivo, |a, b| a.sdivo(b));
    }

    #[test]
    fn test_free_constant_is_sat() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let v = tm.mk_bv_value_u64(bv8, 200).unwrap();
        let eq = tm.mk_term(Kind::Equal, &[x, v], &[]).unwrap();
        assert_eq!(solve_bool(&tm, eq), SatResult::Sat);
    }

    #[test]
    fn test_structural_sharing_across_blasts() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let y = tm.mk_const(bv8, Some("y"));
        let sum = tm.mk_term(Kind::BvAdd, &[x, y], &[]).unwrap();
        let mut bb = BitBlaster::new();
        let v1 = tm.mk_bv_value_u64(bv8, 1).unwrap();
        let eq1 = tm.mk_term(Kind::Equal, &[sum, v1], &[]).unwrap();
        bb.blast_bool(&tm, eq1).unwrap();
        let before = bb.aig.num_ands();
        // A second formula over the same sum reuses its circuit.
        let v2 = tm.mk_bv_value_u64(bv8, 2).unwrap();
        let eq2 = tm.mk_term(Kind::Equal, &[sum, v2], &[]).unwrap();
        bb.blast_bool(&tm, eq2).unwrap();
        let after = bb.aig.num_ands();
        assert!(after - before < 20, "adder should not be rebuilt");
    }

    #[test]
    fn test_registers_theory_leaves() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let fun = tm.mk_fun_sort(&[bv8], bv8).unwrap();
        let f = tm.mk_const(fun, Some("f"));
        let x = tm.mk_const(bv8, Some("x"));
        let app = tm.mk_term(Kind::Apply, &[f, x], &[]).unwrap();
        let v = tm.mk_bv_value_u64(bv8, 3).unwrap();
        let eq = tm.mk_term(Kind::Equal, &[app, v], &[]).unwrap();
        let mut bb = BitBlaster::new();
        bb.blast_bool(&tm, eq).unwrap();
        let regs = bb.take_registered();
        assert!(regs.contains(&app));
        assert!(regs.contains(&x));
    }
}
