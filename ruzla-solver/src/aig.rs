//! And-Inverter Graph.
//!
//! Structurally hashed Boolean circuits with complemented edges. The
//! Tseitin encoder lazily assigns SAT literals to nodes and emits the
//! defining clauses into the SAT port.

use rustc_hash::FxHashMap;
use ruzla_sat::{Lit, SatSolver};

/// A reference to an AIG node with a complement flag in the low bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AigRef(u32);

impl AigRef {
    /// The constant true.
    pub const TRUE: AigRef = AigRef(0);
    /// The constant false.
    pub const FALSE: AigRef = AigRef(1);

    fn new(node: u32, complement: bool) -> Self {
        Self((node << 1) | u32::from(complement))
    }

    fn node(self) -> u32 {
        self.0 >> 1
    }

    fn complemented(self) -> bool {
        (self.0 & 1) != 0
    }

    /// The negation of this reference.
    #[must_use]
    pub fn not(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// True if this is one of the two constants.
    #[must_use]
    pub fn is_const(self) -> bool {
        self.node() == 0
    }
}

#[derive(Debug)]
enum AigNode {
    True,
    Var,
    And(AigRef, AigRef),
}

/// The AIG manager with structural hashing and a CNF literal map.
#[derive(Debug, Default)]
pub struct Aig {
    nodes: Vec<AigNode>,
    unique: FxHashMap<(AigRef, AigRef), AigRef>,
    /// SAT literal per node, assigned by the Tseitin encoder.
    lits: FxHashMap<u32, Lit>,
    num_ands: u64,
}

impl Aig {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![AigNode::True],
            unique: FxHashMap::default(),
            lits: FxHashMap::default(),
            num_ands: 0,
        }
    }

    /// Number of AND nodes created.
    #[must_use]
    pub fn num_ands(&self) -> u64 {
        self.num_ands
    }

    /// A fresh input variable.
    pub fn mk_var(&mut self) -> AigRef {
        let id = self.nodes.len() as u32;
        self.nodes.push(AigNode::Var);
        AigRef::new(id, false)
    }

    /// Conjunction with local two-level simplification and structural
    /// hashing.
    pub fn mk_and(&mut self, a: AigRef, b: AigRef) -> AigRef {
        if a == AigRef::FALSE || b == AigRef::FALSE || a == b.not() {
            return AigRef::FALSE;
        }
        if a == AigRef::TRUE {
            return b;
        }
        if b == AigRef::TRUE || a == b {
            return a;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(&r) = self.unique.get(&key) {
            return r;
        }
        let id = self.nodes.len() as u32;
        self.nodes.push(AigNode::And(key.0, key.1));
        self.num_ands += 1;
        let r = AigRef::new(id, false);
        self.unique.insert(key, r);
        r
    }

    /// Disjunction.
    pub fn mk_or(&mut self, a: AigRef, b: AigRef) -> AigRef {
        self.mk_and(a.not(), b.not()).not()
    }

    /// Exclusive or.
    pub fn mk_xor(&mut self, a: AigRef, b: AigRef) -> AigRef {
        let l = self.mk_and(a, b.not());
        let r = self.mk_and(a.not(), b);
        self.mk_or(l, r)
    }

    /// Equivalence.
    pub fn mk_iff(&mut self, a: AigRef, b: AigRef) -> AigRef {
        self.mk_xor(a, b).not()
    }

    /// Multiplexer: `c ? t : e`.
    pub fn mk_ite(&mut self, c: AigRef, t: AigRef, e: AigRef) -> AigRef {
        let l = self.mk_and(c, t);
        let r = self.mk_and(c.not(), e);
        self.mk_or(l, r)
    }

    /// The SAT literal of a reference, Tseitin-encoding reachable nodes
    /// on first use.
    pub fn lit(&mut self, r: AigRef, sat: &mut dyn SatSolver) -> Lit {
        // Iterative post-order over unencoded nodes.
        let mut stack = vec![r.node()];
        while let Some(&node) = stack.last() {
            if self.lits.contains_key(&node) {
                stack.pop();
                continue;
            }
            match &self.nodes[node as usize] {
                AigNode::True => {
                    let v = sat.new_var();
                    let l = Lit::pos(v);
                    sat.add_clause(&[l]);
                    self.lits.insert(node, l);
                    stack.pop();
                }
                AigNode::Var => {
                    let l = Lit::pos(sat.new_var());
                    self.lits.insert(node, l);
                    stack.pop();
                }
                AigNode::And(a, b) => {
                    let (an, bn) = (a.node(), b.node());
                    if !self.lits.contains_key(&an) {
                        stack.push(an);
                        continue;
                    }
                    if !self.lits.contains_key(&bn) {
                        stack.push(bn);
                        continue;
                    }
                    let (a, b) = (*a, *b);
                    let la = self.ref_lit(a);
                    let lb = self.ref_lit(b);
                    let l = Lit::pos(sat.new_var());
                    // l <-> la & lb
                    sat.add_clause(&[l.negate(), la]);
                    sat.add_clause(&[l.negate(), lb]);
                    sat.add_clause(&[l, la.negate(), lb.negate()]);
                    self.lits.insert(node, l);
                    stack.pop();
                }
            }
        }
        self.ref_lit(r)
    }

    fn ref_lit(&self, r: AigRef) -> Lit {
        let l = self.lits[&r.node()];
        if r.complemented() {
            l.negate()
        } else {
            l
        }
    }

    /// The model value of a reference after a satisfiable SAT call.
    /// Unencoded or unassigned nodes default to false.
    #[must_use]
    pub fn value(&self, r: AigRef, sat: &dyn SatSolver) -> bool {
        let base = match self.lits.get(&r.node()) {
            Some(&l) => sat.value(l).unwrap_or(false),
            None => false,
        };
        base != r.complemented()
    }
}
