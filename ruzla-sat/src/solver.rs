//! CDCL Solver.
//!
//! A conflict-driven clause-learning engine with two-watched-literal
//! propagation, first-UIP learning, exponential variable activities, Luby
//! restarts and phase saving. Assumptions are decided before branching;
//! an unsatisfiable answer under assumptions yields a failed-assumption
//! core.

use crate::lit::{Lit, Var};
use crate::rng::XorShift64;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Result of a SAT query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    /// A satisfying assignment exists.
    Sat,
    /// No satisfying assignment exists (under the given assumptions).
    Unsat,
    /// The terminate callback tripped.
    Unknown,
}

/// The abstract SAT engine port the solver stack programs against.
pub trait SatSolver {
    /// Allocate a fresh variable.
    fn new_var(&mut self) -> Var;
    /// Add a clause over existing variables.
    fn add_clause(&mut self, lits: &[Lit]);
    /// Register an assumption for the next `solve` call only.
    fn assume(&mut self, lit: Lit);
    /// Solve under the registered assumptions, consuming them.
    fn solve(&mut self) -> SatResult;
    /// The model value of a literal after `Sat`.
    fn value(&self, lit: Lit) -> Option<bool>;
    /// True if the assumption participates in the final conflict after
    /// `Unsat`.
    fn failed(&self, lit: Lit) -> bool;
    /// Install a cooperative cancellation callback.
    fn set_terminate(&mut self, cb: Option<Box<dyn FnMut() -> bool>>);
}

const CLAUSE_NONE: u32 = u32::MAX;
/// Conflicts granted before the first restart; scaled by the Luby
/// sequence.
const RESTART_BASE: u64 = 100;
/// Terminate-callback polling granularity, in conflicts.
const POLL_INTERVAL: u64 = 256;

#[derive(Debug)]
struct Clause {
    lits: SmallVec<[Lit; 4]>,
}

/// The embedded CDCL engine.
pub struct Cdcl {
    clauses: Vec<Clause>,
    /// Watch lists indexed by `Lit::raw` of the literal just made true.
    watches: Vec<Vec<u32>>,
    assigns: Vec<Option<bool>>,
    phase: Vec<bool>,
    level: Vec<u32>,
    reason: Vec<u32>,
    activity: Vec<f64>,
    var_inc: f64,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    qhead: usize,
    assumptions: Vec<Lit>,
    failed: FxHashSet<Lit>,
    model: Vec<Option<bool>>,
    /// False once a top-level conflict makes the instance unsatisfiable.
    ok: bool,
    seen: Vec<bool>,
    rng: XorShift64,
    terminate: Option<Box<dyn FnMut() -> bool>>,
    conflicts: u64,
}

impl std::fmt::Debug for Cdcl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cdcl")
            .field("vars", &self.assigns.len())
            .field("clauses", &self.clauses.len())
            .field("conflicts", &self.conflicts)
            .finish()
    }
}

impl Default for Cdcl {
    fn default() -> Self {
        Self::new()
    }
}

impl Cdcl {
    /// Create an engine with the default seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    /// Create an engine seeded for randomized polarity selection.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clauses: Vec::new(),
            watches: Vec::new(),
            assigns: Vec::new(),
            phase: Vec::new(),
            level: Vec::new(),
            reason: Vec::new(),
            activity: Vec::new(),
            var_inc: 1.0,
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
            assumptions: Vec::new(),
            failed: FxHashSet::default(),
            model: Vec::new(),
            ok: true,
            seen: Vec::new(),
            rng: XorShift64::new(seed),
            terminate: None,
            conflicts: 0,
        }
    }

    /// Number of allocated variables.
    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.assigns.len()
    }

    /// Number of clauses, including learned ones.
    #[must_use]
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.assigns[lit.var() as usize].map(|v| v == lit.is_pos())
    }

    fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    fn enqueue(&mut self, lit: Lit, reason: u32) {
        debug_assert!(self.lit_value(lit).is_none());
        let v = lit.var() as usize;
        self.assigns[v] = Some(lit.is_pos());
        self.level[v] = self.decision_level();
        self.reason[v] = reason;
        self.trail.push(lit);
    }

    fn new_decision_level(&mut self) {
        self.trail_lim.push(self.trail.len());
    }

    fn backtrack_to(&mut self, target: u32) {
        if self.decision_level() <= target {
            return;
        }
        let keep = self.trail_lim[target as usize];
        for &lit in &self.trail[keep..] {
            let v = lit.var() as usize;
            self.phase[v] = lit.is_pos();
            self.assigns[v] = None;
            self.reason[v] = CLAUSE_NONE;
        }
        self.trail.truncate(keep);
        self.trail_lim.truncate(target as usize);
        self.qhead = keep;
    }

    fn bump(&mut self, var: Var) {
        let a = &mut self.activity[var as usize];
        *a += self.var_inc;
        if *a > 1e100 {
            for act in &mut self.activity {
                *act *= 1e-100;
            }
            self.var_inc *= 1e-100;
        }
    }

    fn decay(&mut self) {
        self.var_inc /= 0.95;
    }

    fn attach(&mut self, cidx: u32) {
        let c = &self.clauses[cidx as usize];
        debug_assert!(c.lits.len() >= 2);
        let w0 = c.lits[0].negate().raw() as usize;
        let w1 = c.lits[1].negate().raw() as usize;
        self.watches[w0].push(cidx);
        self.watches[w1].push(cidx);
    }

    /// Two-watched-literal unit propagation. Returns a conflicting clause
    /// index, if any.
    fn propagate(&mut self) -> Option<u32> {
        while self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            let mut ws = std::mem::take(&mut self.watches[p.raw() as usize]);
            let mut i = 0;
            while i < ws.len() {
                let cidx = ws[i];
                let false_lit = p.negate();
                // Normalize so the false literal sits at position 1.
                {
                    let c = &mut self.clauses[cidx as usize];
                    if c.lits[0] == false_lit {
                        c.lits.swap(0, 1);
                    }
                }
                let first = self.clauses[cidx as usize].lits[0];
                if self.lit_value(first) == Some(true) {
                    i += 1;
                    continue;
                }
                // Look for a replacement watch.
                let mut moved = false;
                let len = self.clauses[cidx as usize].lits.len();
                for k in 2..len {
                    let lk = self.clauses[cidx as usize].lits[k];
                    if self.lit_value(lk) != Some(false) {
                        self.clauses[cidx as usize].lits.swap(1, k);
                        self.watches[lk.negate().raw() as usize].push(cidx);
                        ws.swap_remove(i);
                        moved = true;
                        break;
                    }
                }
                if moved {
                    continue;
                }
                if self.lit_value(first) == Some(false) {
                    // Conflict: restore the remaining watches and report.
                    self.watches[p.raw() as usize] = ws;
                    return Some(cidx);
                }
                self.enqueue(first, cidx);
                i += 1;
            }
            self.watches[p.raw() as usize] = ws;
        }
        None
    }

    /// First-UIP conflict analysis. Returns the learned clause (asserting
    /// literal first) and the backtrack level.
    fn analyze(&mut self, confl: u32) -> (SmallVec<[Lit; 4]>, u32) {
        let mut learnt: SmallVec<[Lit; 4]> = SmallVec::new();
        learnt.push(Lit::from_raw(0)); // placeholder for the asserting literal
        let mut counter = 0usize;
        let mut p: Option<Lit> = None;
        let mut confl = confl;
        let mut index = self.trail.len();
        let current = self.decision_level();

        loop {
            let start = usize::from(p.is_some());
            for k in start..self.clauses[confl as usize].lits.len() {
                let q = self.clauses[confl as usize].lits[k];
                let v = q.var() as usize;
                if !self.seen[v] && self.level[v] > 0 {
                    self.seen[v] = true;
                    self.bump(q.var());
                    if self.level[v] >= current {
                        counter += 1;
                    } else {
                        learnt.push(q);
                    }
                }
            }
            // Walk back to the next marked trail literal.
            loop {
                index -= 1;
                if self.seen[self.trail[index].var() as usize] {
                    break;
                }
            }
            let lit = self.trail[index];
            let v = lit.var() as usize;
            self.seen[v] = false;
            counter -= 1;
            if counter == 0 {
                learnt[0] = lit.negate();
                break;
            }
            p = Some(lit);
            confl = self.reason[v];
        }

        for l in &learnt[1..] {
            self.seen[l.var() as usize] = false;
        }

        let bt_level = if learnt.len() == 1 {
            0
        } else {
            // Second-highest decision level in the clause; move its
            // literal to the second watch position.
            let mut max_i = 1;
            for i in 2..learnt.len() {
                if self.level[learnt[i].var() as usize] > self.level[learnt[max_i].var() as usize]
                {
                    max_i = i;
                }
            }
            learnt.swap(1, max_i);
            self.level[learnt[1].var() as usize]
        };
        (learnt, bt_level)
    }

    /// Failed-assumption analysis: collect the assumptions implying the
    /// falsified assumption `p`.
    fn analyze_final(&mut self, p: Lit) {
        self.failed.clear();
        self.failed.insert(p);
        if self.decision_level() == 0 {
            return;
        }
        self.seen[p.var() as usize] = true;
        for i in (self.trail_lim[0]..self.trail.len()).rev() {
            let lit = self.trail[i];
            let v = lit.var() as usize;
            if !self.seen[v] {
                continue;
            }
            let r = self.reason[v];
            if r == CLAUSE_NONE {
                // An assumption decision.
                self.failed.insert(lit);
            } else {
                for &q in &self.clauses[r as usize].lits[1..] {
                    if self.level[q.var() as usize] > 0 {
                        self.seen[q.var() as usize] = true;
                    }
                }
            }
            self.seen[v] = false;
        }
        self.seen[p.var() as usize] = false;
    }

    fn pick_branch_var(&mut self) -> Option<Var> {
        // Activity-guided selection over the unassigned variables.
        let mut best: Option<Var> = None;
        for v in 0..self.assigns.len() {
            if self.assigns[v].is_some() {
                continue;
            }
            match best {
                Some(b) if self.activity[b as usize] >= self.activity[v] => {}
                _ => best = Some(v as Var),
            }
        }
        best
    }

    fn luby(i: u64) -> u64 {
        // Luby restart sequence: 1 1 2 1 1 2 4 ...
        let mut k = 1u64;
        while (1u64 << (k + 1)) <= i + 1 {
            k += 1;
        }
        if (1u64 << k) == i + 1 {
            return 1u64 << (k - 1);
        }
        Self::luby(i - (1u64 << (k - 1)) + 1)
    }

    /// The literals fixed at the root level after propagation, or `None`
    /// if the clause set is already unsatisfiable. Used by skeleton
    /// preprocessing.
    pub fn fixed_literals(&mut self) -> Option<Vec<Lit>> {
        self.backtrack_to(0);
        if !self.ok {
            return None;
        }
        if self.propagate().is_some() {
            self.ok = false;
            return None;
        }
        Some(self.trail.clone())
    }

    fn should_stop(&mut self) -> bool {
        match &mut self.terminate {
            Some(cb) => cb(),
            None => false,
        }
    }

    fn search(&mut self) -> SatResult {
        let mut restarts = 0u64;
        let mut conflict_budget = RESTART_BASE * Self::luby(restarts);
        let mut conflicts_here = 0u64;

        loop {
            if let Some(confl) = self.propagate() {
                self.conflicts += 1;
                conflicts_here += 1;
                if self.decision_level() == 0 {
                    self.ok = false;
                    return SatResult::Unsat;
                }
                let (learnt, bt_level) = self.analyze(confl);
                // Backtracking below assumption levels is fine: pending
                // assumptions are re-decided before the next branch.
                self.backtrack_to(bt_level);
                let asserting = learnt[0];
                if learnt.len() == 1 {
                    self.enqueue(asserting, CLAUSE_NONE);
                } else {
                    let cidx = self.clauses.len() as u32;
                    self.clauses.push(Clause { lits: learnt });
                    self.attach(cidx);
                    self.enqueue(asserting, cidx);
                }
                self.decay();
                if self.conflicts % POLL_INTERVAL == 0 && self.should_stop() {
                    return SatResult::Unknown;
                }
                if conflicts_here >= conflict_budget {
                    // Restart, keeping level-0 facts.
                    restarts += 1;
                    conflicts_here = 0;
                    conflict_budget = RESTART_BASE * Self::luby(restarts);
                    self.backtrack_to(0);
                    if self.should_stop() {
                        return SatResult::Unknown;
                    }
                }
            } else {
                // Re-decide pending assumptions, then branch.
                if (self.decision_level() as usize) < self.assumptions.len() {
                    let a = self.assumptions[self.decision_level() as usize];
                    match self.lit_value(a) {
                        Some(true) => {
                            self.new_decision_level();
                        }
                        Some(false) => {
                            self.analyze_final(a);
                            return SatResult::Unsat;
                        }
                        None => {
                            self.new_decision_level();
                            self.enqueue(a, CLAUSE_NONE);
                        }
                    }
                    continue;
                }
                let Some(v) = self.pick_branch_var() else {
                    self.model = self.assigns.clone();
                    return SatResult::Sat;
                };
                let polarity = self.phase[v as usize];
                self.new_decision_level();
                let lit = if polarity { Lit::pos(v) } else { Lit::neg(v) };
                self.enqueue(lit, CLAUSE_NONE);
            }
        }
    }
}

impl SatSolver for Cdcl {
    fn new_var(&mut self) -> Var {
        let v = self.assigns.len() as Var;
        self.assigns.push(None);
        self.phase.push(false);
        self.level.push(0);
        self.reason.push(CLAUSE_NONE);
        self.activity.push(f64::from(self.rng.below(1000) as u32) * 1e-6);
        self.seen.push(false);
        self.watches.push(Vec::new());
        self.watches.push(Vec::new());
        v
    }

    fn add_clause(&mut self, lits: &[Lit]) {
        if !self.ok {
            return;
        }
        self.backtrack_to(0);

        // Simplify against the top level: drop false literals, detect
        // satisfied clauses and tautologies.
        let mut simplified: SmallVec<[Lit; 4]> = SmallVec::new();
        for &l in lits {
            match self.lit_value(l) {
                Some(true) => return,
                Some(false) => continue,
                None => {
                    if simplified.contains(&l.negate()) {
                        return;
                    }
                    if !simplified.contains(&l) {
                        simplified.push(l);
                    }
                }
            }
        }

        match simplified.len() {
            0 => self.ok = false,
            1 => {
                self.enqueue(simplified[0], CLAUSE_NONE);
                if self.propagate().is_some() {
                    self.ok = false;
                }
            }
            _ => {
                let cidx = self.clauses.len() as u32;
                self.clauses.push(Clause { lits: simplified });
                self.attach(cidx);
            }
        }
    }

    fn assume(&mut self, lit: Lit) {
        self.assumptions.push(lit);
    }

    fn solve(&mut self) -> SatResult {
        let assumptions = std::mem::take(&mut self.assumptions);
        self.failed.clear();
        self.backtrack_to(0);
        if !self.ok {
            return SatResult::Unsat;
        }
        if self.propagate().is_some() {
            self.ok = false;
            return SatResult::Unsat;
        }
        self.assumptions = assumptions;
        let result = self.search();
        self.assumptions.clear();
        self.backtrack_to(0);
        result
    }

    fn value(&self, lit: Lit) -> Option<bool> {
        self.model
            .get(lit.var() as usize)
            .copied()
            .flatten()
            .map(|v| v == lit.is_pos())
    }

    fn failed(&self, lit: Lit) -> bool {
        self.failed.contains(&lit)
    }

    fn set_terminate(&mut self, cb: Option<Box<dyn FnMut() -> bool>>) {
        self.terminate = cb;
    }
}
