//! The Solving Context Facade.
//!
//! Wires assertions through preprocessing, word-blasting and bit-blasting
//! into the SAT engine, runs the congruence refinement loop, and exposes
//! the user-facing operations: assert, push/pop, check-sat (with
//! assumptions), simplify, value queries, unsat cores and formula
//! dumping.
//!
//! Per check, the engine moves through
//! `PREPROCESSING -> BIT_BLASTING -> SAT_SOLVING -> CONGRUENCE_CHECK`,
//! looping between the last two until the congruence engine stops
//! emitting lemmas. The terminator is polled before every phase and
//! inside the SAT engine, so cancellation latency is bounded by one pass
//! or one restart.
//!
//! Embedders mapping results to exit codes use 10 for `Sat`, 20 for
//! `Unsat` and 0 otherwise.

use crate::backtrack::{AssertionStack, BacktrackManager, Backtrackable, ScopedVec};
use crate::bitblast::BitBlaster;
use crate::fun::{FunSolver, ModelProbe};
use crate::model::Evaluator;
use crate::preprocess::{PassCtx, Preprocessor};
use crate::quant;
use crate::wordblast::WordBlaster;
use crate::Terminate;
use ruzla_core::error::{type_error, usage_error, Error, Result};
use ruzla_core::fp::{FloatingPoint, RoundingMode};
use ruzla_core::printer::Printer;
use ruzla_core::sort::{SortId, SortKind};
use ruzla_core::{BitVector, Kind, Options, Rewriter, TermId, TermManager};
use ruzla_sat::{Cdcl, Lit, SatResult, SatSolver};
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::rc::Rc;

/// Result of a satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverResult {
    /// The assertions are satisfiable.
    Sat,
    /// The assertions are unsatisfiable.
    Unsat,
    /// The terminator tripped or the query is out of the supported
    /// fragment (remaining quantifiers).
    Unknown,
}

/// Aggregated solver statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Statistics {
    /// check-sat calls.
    pub num_checks: u64,
    /// SAT rounds across all checks.
    pub num_sat_rounds: u64,
    /// Congruence lemmas asserted.
    pub num_lemmas: u64,
    /// Preprocessing fixed-point iterations.
    pub num_preprocess_iterations: u64,
    /// AND nodes in the circuit graph.
    pub num_aig_ands: u64,
    /// Clauses in the SAT engine, learned included.
    pub num_cnf_clauses: u64,
}

type SharedTerminator = Rc<RefCell<Option<Box<dyn Terminate>>>>;

struct EngineProbe<'a> {
    blaster: &'a BitBlaster,
    sat: &'a Cdcl,
}

impl ModelProbe for EngineProbe<'_> {
    fn bool_value(&self, t: TermId) -> Option<bool> {
        let r = self.blaster.bool_ref(t)?;
        Some(self.blaster.aig.value(r, self.sat))
    }

    fn bv_value(&self, t: TermId) -> Option<BitVector> {
        let bits = self.blaster.bits(t)?;
        // MSB-first binary rendering of the assignment.
        let s: String = bits
            .iter()
            .rev()
            .map(|&b| {
                if self.blaster.aig.value(b, self.sat) {
                    '1'
                } else {
                    '0'
                }
            })
            .collect();
        BitVector::from_str(bits.len() as u64, &s, 2).ok()
    }
}

/// The user-facing solver instance.
pub struct SolvingContext {
    options: Options,
    tm: TermManager,
    rewriter: Rewriter,
    backtrack: BacktrackManager,
    assertions: AssertionStack,
    /// User assertions in input order, scoped with the stack.
    original: ScopedVec<TermId>,
    preprocessor: Preprocessor,
    wordblaster: WordBlaster,
    blaster: BitBlaster,
    sat: Cdcl,
    fun: FunSolver,
    terminator: SharedTerminator,
    abort_callback: Option<Box<dyn FnMut(&str)>>,
    last_result: Option<SolverResult>,
    /// Per-check selector literals for core extraction: (origin, lit).
    core_lits: Vec<(usize, Lit)>,
    /// Per-check assumption literals: (term, lit).
    assumption_lits: Vec<(TermId, Lit)>,
    /// Level-0 assertions already added as permanent clauses.
    permanent: FxHashSet<TermId>,
    stats: Statistics,
}

impl SolvingContext {
    /// Create a context bound to a copy of the given options.
    #[must_use]
    pub fn new(options: Options) -> Self {
        if options.bv_solver != ruzla_core::options::BvSolverMode::Bitblast {
            tracing::warn!(
                "bv-solver mode without a local-search engine; falling back to bitblast"
            );
        }
        let rewriter = Rewriter::new(options.rewrite_level);
        let sat = ruzla_sat::new_engine(options.sat_solver, options.seed);
        Self {
            rewriter,
            sat,
            tm: TermManager::new(),
            backtrack: BacktrackManager::new(),
            assertions: AssertionStack::new(),
            original: ScopedVec::new(),
            preprocessor: Preprocessor::new(),
            wordblaster: WordBlaster::new(),
            blaster: BitBlaster::new(),
            fun: FunSolver::new(),
            terminator: Rc::new(RefCell::new(None)),
            abort_callback: None,
            last_result: None,
            core_lits: Vec::new(),
            assumption_lits: Vec::new(),
            permanent: FxHashSet::default(),
            stats: Statistics::default(),
            options,
        }
    }

    /// The term manager; all terms asserted here must come from it.
    pub fn tm(&mut self) -> &mut TermManager {
        &mut self.tm
    }

    /// Read-only access to the term manager.
    #[must_use]
    pub fn tm_ref(&self) -> &TermManager {
        &self.tm
    }

    /// The bound options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Install or clear the cooperative terminator.
    pub fn set_terminator(&mut self, terminator: Option<Box<dyn Terminate>>) {
        *self.terminator.borrow_mut() = terminator;
    }

    /// Replace the abort hook invoked on internal errors.
    pub fn set_abort_callback(&mut self, cb: Option<Box<dyn FnMut(&str)>>) {
        self.abort_callback = cb;
    }

    /// Aggregated statistics.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        let mut s = self.stats;
        s.num_preprocess_iterations = self.preprocessor.stats().num_iterations;
        s.num_lemmas = self.fun.num_lemmas();
        s.num_aig_ands = self.blaster.aig.num_ands();
        s.num_cnf_clauses = self.sat.num_clauses() as u64;
        s
    }

    /// The current scope level.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.backtrack.level()
    }

    fn abort(&mut self, msg: &str) -> ! {
        if let Some(cb) = &mut self.abort_callback {
            cb(msg);
        }
        panic!("internal error: {msg}");
    }

    fn terminated(&self) -> bool {
        self.terminator
            .borrow_mut()
            .as_mut()
            .is_some_and(|t| t.terminated())
    }

    /* ---- assertions and scopes -------------------------------------------- */

    /// Assert a Boolean formula at the current level.
    pub fn assert_formula(&mut self, term: TermId) -> Result<()> {
        if !self.tm.is_bool_sort(self.tm.sort(term)) {
            return Err(type_error("asserted terms must be Boolean"));
        }
        let origin = self.original.len();
        self.original.push(term);
        self.assertions.push_assertion(term, origin);
        self.last_result = None;
        Ok(())
    }

    /// Open `n` scope levels.
    pub fn push(&mut self, n: u32) -> Result<()> {
        if n > 0 && !self.options.incremental {
            return Err(usage_error("push requires incremental mode"));
        }
        for _ in 0..n {
            self.backtrack.push();
            self.assertions.on_push();
            self.original.on_push();
            self.preprocessor.on_push();
        }
        self.last_result = None;
        Ok(())
    }

    /// Close `n` scope levels, discarding their assertions and caches.
    pub fn pop(&mut self, n: u32) -> Result<()> {
        if n > 0 && !self.options.incremental {
            return Err(usage_error("pop requires incremental mode"));
        }
        if n > self.backtrack.level() {
            return Err(usage_error("cannot pop past the root level"));
        }
        for _ in 0..n {
            self.backtrack.pop();
            self.assertions.on_pop();
            self.original.on_pop();
            self.preprocessor.on_pop();
        }
        self.preprocessor.notify_pop(&self.assertions);
        self.last_result = None;
        Ok(())
    }

    /* ---- solving ----------------------------------------------------------- */

    /// Check satisfiability of the current assertions.
    pub fn check_sat(&mut self) -> SolverResult {
        match self.check_sat_assuming(&[]) {
            Ok(r) => r,
            Err(Error::Internal(msg)) => self.abort(&msg),
            Err(_) => SolverResult::Unknown,
        }
    }

    /// Check satisfiability under additional assumptions (incremental
    /// mode only).
    pub fn check_sat_assuming(&mut self, assumptions: &[TermId]) -> Result<SolverResult> {
        if !assumptions.is_empty() && !self.options.incremental {
            return Err(usage_error("assumptions require incremental mode"));
        }
        for &a in assumptions {
            if !self.tm.is_bool_sort(self.tm.sort(a)) {
                return Err(type_error("assumptions must be Boolean"));
            }
        }
        self.stats.num_checks += 1;
        self.core_lits.clear();
        self.assumption_lits.clear();

        // PREPROCESSING
        let term = Rc::clone(&self.terminator);
        let mut stop = move || {
            term.borrow_mut()
                .as_mut()
                .is_some_and(|t| t.terminated())
        };
        let mut ctx = PassCtx {
            tm: &mut self.tm,
            rewriter: &mut self.rewriter,
            options: &self.options,
        };
        if !self
            .preprocessor
            .preprocess(&mut ctx, &mut self.assertions, &mut stop)?
        {
            self.last_result = Some(SolverResult::Unknown);
            return Ok(SolverResult::Unknown);
        }

        // Remaining quantifiers put the query outside the supported
        // fragment.
        let roots: Vec<TermId> = self
            .assertions
            .entries()
            .iter()
            .map(|a| a.term)
            .chain(assumptions.iter().copied())
            .collect();
        if quant::contains_quantifier(&self.tm, roots.iter().copied()) {
            self.last_result = Some(SolverResult::Unknown);
            return Ok(SolverResult::Unknown);
        }

        // BIT_BLASTING (word-blasting first)
        let entries: Vec<(u32, TermId, usize)> = self
            .assertions
            .entries()
            .iter()
            .map(|a| (a.level, a.term, a.origin))
            .collect();
        for (level, term, origin) in entries {
            let lit = self.encode(term)?;
            if self.options.produce_unsat_cores {
                self.sat.assume(lit);
                self.core_lits.push((origin, lit));
            } else if level == 0 {
                if self.permanent.insert(term) {
                    self.sat.add_clause(&[lit]);
                }
            } else {
                self.sat.assume(lit);
            }
            if self.terminated() {
                self.last_result = Some(SolverResult::Unknown);
                return Ok(SolverResult::Unknown);
            }
        }
        for &a in assumptions {
            let processed = {
                let mut ctx = PassCtx {
                    tm: &mut self.tm,
                    rewriter: &mut self.rewriter,
                    options: &self.options,
                };
                self.preprocessor.process(&mut ctx, a)?
            };
            let lit = self.encode(processed)?;
            self.sat.assume(lit);
            self.assumption_lits.push((a, lit));
        }

        // SAT_SOLVING <-> CONGRUENCE_CHECK
        let term2 = Rc::clone(&self.terminator);
        self.sat.set_terminate(Some(Box::new(move || {
            term2
                .borrow_mut()
                .as_mut()
                .is_some_and(|t| t.terminated())
        })));
        let scoped: Vec<TermId> = self
            .assertions
            .entries()
            .iter()
            .filter(|a| a.level > 0 && !self.options.produce_unsat_cores)
            .map(|a| a.term)
            .collect();
        let result = loop {
            if self.terminated() {
                break SolverResult::Unknown;
            }
            self.stats.num_sat_rounds += 1;
            match self.sat.solve() {
                SatResult::Unknown => break SolverResult::Unknown,
                SatResult::Unsat => break SolverResult::Unsat,
                SatResult::Sat => {
                    let lemmas = {
                        let probe = EngineProbe {
                            blaster: &self.blaster,
                            sat: &self.sat,
                        };
                        self.fun.check(&mut self.tm, &probe)?
                    };
                    if lemmas.is_empty() {
                        break SolverResult::Sat;
                    }
                    tracing::debug!(count = lemmas.len(), "asserting congruence lemmas");
                    for lemma in lemmas {
                        let simplified = self.rewriter.rewrite(&mut self.tm, lemma)?;
                        let lit = self.encode(simplified)?;
                        self.sat.add_clause(&[lit]);
                    }
                    // Re-assume: solving consumed the assumptions.
                    let core: Vec<Lit> = self.core_lits.iter().map(|&(_, l)| l).collect();
                    for lit in core {
                        self.sat.assume(lit);
                    }
                    for term in scoped.clone() {
                        if let Some(r) = self.lit_of(term) {
                            self.sat.assume(r);
                        }
                    }
                    let assumed: Vec<Lit> =
                        self.assumption_lits.iter().map(|&(_, l)| l).collect();
                    for lit in assumed {
                        self.sat.assume(lit);
                    }
                }
            }
        };
        self.sat.set_terminate(None);
        self.last_result = Some(result);
        Ok(result)
    }

    /// Word-blast, bit-blast and Tseitin-encode one Boolean term.
    fn encode(&mut self, term: TermId) -> Result<Lit> {
        let lowered = self.wordblaster.lower(&mut self.tm, term)?;
        let lowered = self.rewriter.rewrite(&mut self.tm, lowered)?;
        for side in self.wordblaster.take_side_conditions() {
            let simplified = self.rewriter.rewrite(&mut self.tm, side)?;
            let r = self.blaster.blast_bool(&self.tm, simplified)?;
            let l = self.blaster.aig.lit(r, &mut self.sat);
            self.sat.add_clause(&[l]);
        }
        let r = self.blaster.blast_bool(&self.tm, lowered)?;
        for leaf in self.blaster.take_registered() {
            self.fun.register(&self.tm, leaf);
        }
        Ok(self.blaster.aig.lit(r, &mut self.sat))
    }

    /// The already-encoded literal of a term, if any.
    fn lit_of(&mut self, term: TermId) -> Option<Lit> {
        let lowered = self.wordblaster.lower(&mut self.tm, term).ok()?;
        let lowered = self.rewriter.rewrite(&mut self.tm, lowered).ok()?;
        let r = self.blaster.bool_ref(lowered)?;
        Some(self.blaster.aig.lit(r, &mut self.sat))
    }

    /// Preprocess the current assertions without solving. Returns `Sat`
    /// if they reduce to `true`, `Unsat` if any reduces to `false`, and
    /// `Unknown` otherwise.
    pub fn simplify(&mut self) -> SolverResult {
        let term = Rc::clone(&self.terminator);
        let mut stop = move || {
            term.borrow_mut()
                .as_mut()
                .is_some_and(|t| t.terminated())
        };
        let mut ctx = PassCtx {
            tm: &mut self.tm,
            rewriter: &mut self.rewriter,
            options: &self.options,
        };
        let done = self
            .preprocessor
            .preprocess(&mut ctx, &mut self.assertions, &mut stop);
        match done {
            Ok(true) => {
                let mut all_true = true;
                for a in self.assertions.entries() {
                    if self.tm.is_bool_value(a.term, false) {
                        return SolverResult::Unsat;
                    }
                    all_true &= self.tm.is_bool_value(a.term, true);
                }
                if all_true {
                    SolverResult::Sat
                } else {
                    SolverResult::Unknown
                }
            }
            Ok(false) => SolverResult::Unknown,
            Err(Error::Internal(msg)) => self.abort(&msg),
            Err(_) => SolverResult::Unknown,
        }
    }

    /* ---- model and core queries ------------------------------------------- */

    /// The model value of a term after a satisfiable check.
    pub fn get_value(&mut self, term: TermId) -> Result<TermId> {
        if self.last_result != Some(SolverResult::Sat) {
            return Err(usage_error("get_value requires a satisfiable check"));
        }
        if !self.options.produce_models {
            return Err(usage_error("get_value requires produce-models"));
        }
        let processed = {
            let mut ctx = PassCtx {
                tm: &mut self.tm,
                rewriter: &mut self.rewriter,
                options: &self.options,
            };
            self.preprocessor.process(&mut ctx, term)?
        };
        // Unregistered quantified terms evaluate to themselves.
        if quant::contains_quantifier(&self.tm, [processed]) {
            return Ok(term);
        }
        let sort = self.tm.sort(term);
        let lowered = self.wordblaster.lower(&mut self.tm, processed)?;
        let probe = EngineProbe {
            blaster: &self.blaster,
            sat: &self.sat,
        };
        let mut evaluator = Evaluator {
            tm: &mut self.tm,
            rewriter: &mut self.rewriter,
            probe: &probe,
            fun: &self.fun,
        };
        let value = match evaluator.tm.sort_kind(sort) {
            SortKind::Fun(_) => evaluator.fun_value(lowered)?,
            SortKind::Array(..) => evaluator.array_value(lowered)?,
            _ => evaluator.value(lowered)?,
        };
        self.unlower_value(value, sort)
    }

    /// Re-wrap a lowered (bit-vector) value into the original FP/RM sort.
    fn unlower_value(&mut self, value: TermId, sort: SortId) -> Result<TermId> {
        match self.tm.sort_kind(sort) {
            SortKind::Fp(e, s) => {
                let fmt = ruzla_core::fp::FpFormat::new(*e, *s);
                let bv = self
                    .tm
                    .value(value)
                    .and_then(ruzla_core::Value::as_bitvector)
                    .cloned()
                    .ok_or_else(|| usage_error("no packed value for FP term"))?;
                Ok(self.tm.mk_fp(FloatingPoint::new(fmt, bv)))
            }
            SortKind::Rm => {
                let bv = self
                    .tm
                    .value(value)
                    .and_then(ruzla_core::Value::as_bitvector)
                    .cloned()
                    .ok_or_else(|| usage_error("no encoded value for RM term"))?;
                let rm = RoundingMode::from_index(bv.to_u64().unwrap_or(0))
                    .unwrap_or(RoundingMode::Rne);
                Ok(self.tm.mk_rm_value(rm))
            }
            SortKind::Array(_, elem) => {
                let elem = *elem;
                match self.tm.kind(value) {
                    Kind::Store => {
                        let children: Vec<TermId> = self.tm.children(value).to_vec();
                        let base = self.unlower_value(children[0], sort)?;
                        let val = self.unlower_value(children[2], elem)?;
                        self.tm.mk_term(Kind::Store, &[base, children[1], val], &[])
                    }
                    Kind::ConstArray => {
                        let c = self.tm.child(value, 0);
                        let cv = self.unlower_value(c, elem)?;
                        // Rebuild in the original (unlowered) array sort
                        // when the element sort allows it.
                        if self.tm.sort(cv) == elem {
                            self.tm.mk_const_array(sort, cv)
                        } else {
                            Ok(value)
                        }
                    }
                    _ => Ok(value),
                }
            }
            _ => Ok(value),
        }
    }

    /// A subset of the original assertions that is jointly unsatisfiable.
    pub fn get_unsat_core(&mut self) -> Result<Vec<TermId>> {
        if !self.options.produce_unsat_cores {
            return Err(usage_error("get_unsat_core requires produce-unsat-cores"));
        }
        if self.last_result != Some(SolverResult::Unsat) {
            return Err(usage_error("get_unsat_core requires an unsat check"));
        }
        let mut origins: Vec<usize> = self
            .core_lits
            .iter()
            .filter(|&&(_, lit)| self.sat.failed(lit))
            .map(|&(origin, _)| origin)
            .collect();
        origins.sort_unstable();
        origins.dedup();
        Ok(origins
            .into_iter()
            .filter_map(|o| self.original.get(o).copied())
            .collect())
    }

    /// The assumptions participating in the last unsatisfiable answer.
    pub fn get_unsat_assumptions(&mut self) -> Result<Vec<TermId>> {
        if !self.options.incremental {
            return Err(usage_error("get_unsat_assumptions requires incremental mode"));
        }
        if self.last_result != Some(SolverResult::Unsat) {
            return Err(usage_error(
                "get_unsat_assumptions requires an unsat check",
            ));
        }
        Ok(self
            .assumption_lits
            .iter()
            .filter(|&&(_, lit)| self.sat.failed(lit))
            .map(|&(term, _)| term)
            .collect())
    }

    /// Write the current assertions as an SMT-LIB script. The only
    /// recognized format is `"smt2"`.
    pub fn dump_formula(&self, out: &mut impl std::fmt::Write, format: &str) -> Result<()> {
        if format != "smt2" {
            return Err(usage_error(format!("unknown dump format '{format}'")));
        }
        let printer = Printer::new(&self.tm);
        let terms: Vec<TermId> = self.assertions.entries().iter().map(|a| a.term).collect();
        printer
            .write_formula(out, &terms)
            .map_err(|e| usage_error(format!("write failed: {e}")))
    }
}

impl std::fmt::Debug for SolvingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolvingContext")
            .field("level", &self.backtrack.level())
            .field("assertions", &self.assertions.len())
            .field("last_result", &self.last_result)
            .finish()
    }
}
