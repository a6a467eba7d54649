//! Solver Configuration.
//!
//! A plain record of typed knobs plus string-keyed accessors for CLI-style
//! configuration. A [`Options`] value is cloned into a solving context at
//! construction; later mutations of the original do not affect the
//! context.

use crate::error::{usage_error, Result};

/// Maximum verbosity level.
pub const VERBOSITY_MAX: u64 = 4;
/// Maximum rewrite level.
pub const REWRITE_LEVEL_MAX: u64 = 2;
/// Probability scale: 100% in permille.
pub const PROB_100: u64 = 1000;
/// Probability scale: 50% in permille.
pub const PROB_50: u64 = 500;

/// Bit-vector decision procedure selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BvSolverMode {
    /// Eager bit-blasting to CNF.
    #[default]
    Bitblast,
    /// Propagation-based local search.
    Prop,
    /// Local search first, bit-blasting as fallback.
    Preprop,
}

/// Embedded SAT engine selection.
///
/// All modes resolve to the built-in CDCL engine; the names are accepted
/// for configuration compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SatSolverMode {
    /// CaDiCaL-style default.
    #[default]
    Cadical,
    /// CryptoMiniSat.
    Cryptominisat,
    /// Kissat.
    Kissat,
    /// Lingeling.
    Lingeling,
}

/// Path selection heuristic for the propagation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropPathSelection {
    /// Select essential inputs.
    #[default]
    Essential,
    /// Select randomly.
    Random,
}

/// The solver options record.
#[derive(Debug, Clone)]
pub struct Options {
    /// Allow push/pop and repeated check-sat calls.
    pub incremental: bool,
    /// Retain model information after a satisfiable check.
    pub produce_models: bool,
    /// Track assertion provenance for unsat cores.
    pub produce_unsat_cores: bool,
    /// PRNG seed for randomized subroutines.
    pub seed: u64,
    /// Diagnostic output level (0-4).
    pub verbosity: u64,
    /// Finer log granularity.
    pub log_level: u64,
    /// Bit-vector decision procedure.
    pub bv_solver: BvSolverMode,
    /// Embedded CDCL engine.
    pub sat_solver: SatSolverMode,
    /// Rewriter intensity (0-2).
    pub rewrite_level: u64,
    /// Competition-tuned defaults.
    pub smt_comp_mode: bool,

    /// Propagation engine: use constant bit information.
    pub prop_const_bits: bool,
    /// Propagation engine: infer inequality bounds.
    pub prop_ineq_bounds: bool,
    /// Propagation engine: propagation step limit (0 = none).
    pub prop_nprops: u64,
    /// Propagation engine: model update limit (0 = none).
    pub prop_nupdates: u64,
    /// Propagation engine: path selection heuristic.
    pub prop_path_sel: PropPathSelection,
    /// Propagation engine: probability of picking an inverse value
    /// (permille).
    pub prop_prob_pick_inv_value: u64,
    /// Propagation engine: probability of picking a random input
    /// (permille).
    pub prop_prob_pick_random_input: u64,
    /// Propagation engine: sign-extension aware moves.
    pub prop_sext: bool,
    /// Propagation engine: optimize concat/sign-extend under ult.
    pub prop_opt_lt_concat_sext: bool,

    /// Preprocessing: eliminate contradicting ands.
    pub pp_contradicting_ands: bool,
    /// Preprocessing: eliminate redundant bit-vector extracts.
    pub pp_elim_bv_extracts: bool,
    /// Preprocessing: extract embedded constraints.
    pub pp_embedded_constr: bool,
    /// Preprocessing: flatten nested conjunctions.
    pub pp_flatten_and: bool,
    /// Preprocessing: arithmetic normalization.
    pub pp_normalize: bool,
    /// Preprocessing: sharing-aware normalization.
    pub pp_normalize_share_aware: bool,
    /// Preprocessing: propositional skeleton simplification.
    pub pp_skeleton_preproc: bool,
    /// Preprocessing: variable substitution.
    pub pp_variable_subst: bool,
    /// Preprocessing: normalize equalities for substitution.
    pub pp_variable_subst_norm_eq: bool,
    /// Preprocessing: normalize bit-vector inequalities for substitution.
    pub pp_variable_subst_norm_bv_ineq: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            incremental: false,
            produce_models: false,
            produce_unsat_cores: false,
            seed: 42,
            verbosity: 0,
            log_level: 0,
            bv_solver: BvSolverMode::default(),
            sat_solver: SatSolverMode::default(),
            rewrite_level: REWRITE_LEVEL_MAX,
            smt_comp_mode: false,
            prop_const_bits: true,
            prop_ineq_bounds: true,
            prop_nprops: 0,
            prop_nupdates: 0,
            prop_path_sel: PropPathSelection::default(),
            prop_prob_pick_inv_value: 990,
            prop_prob_pick_random_input: 10,
            prop_sext: true,
            prop_opt_lt_concat_sext: true,
            pp_contradicting_ands: true,
            pp_elim_bv_extracts: false,
            pp_embedded_constr: true,
            pp_flatten_and: true,
            pp_normalize: true,
            pp_normalize_share_aware: true,
            pp_skeleton_preproc: true,
            pp_variable_subst: true,
            pp_variable_subst_norm_eq: true,
            pp_variable_subst_norm_bv_ineq: false,
        }
    }
}

impl Options {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `name` is a recognized option.
    #[must_use]
    pub fn is_valid(name: &str) -> bool {
        Self::default().get(name).is_ok()
    }

    /// Set an option by long name from a string value.
    ///
    /// Booleans accept `true`/`false`/`1`/`0`; numeric options are range
    /// checked; mode options validate their mode strings.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        fn boolean(value: &str) -> Result<bool> {
            match value {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(usage_error(format!("expected Boolean value, got '{value}'"))),
            }
        }
        fn numeric(value: &str, max: u64) -> Result<u64> {
            let v: u64 = value
                .parse()
                .map_err(|_| usage_error(format!("expected numeric value, got '{value}'")))?;
            if v > max {
                return Err(usage_error(format!("value {v} exceeds maximum {max}")));
            }
            Ok(v)
        }

        match name {
            "incremental" => self.incremental = boolean(value)?,
            "produce-models" => self.produce_models = boolean(value)?,
            "produce-unsat-cores" => self.produce_unsat_cores = boolean(value)?,
            "seed" => self.seed = numeric(value, u64::MAX)?,
            "verbosity" => self.verbosity = numeric(value, VERBOSITY_MAX)?,
            "log-level" => self.log_level = numeric(value, u64::MAX)?,
            "bv-solver" => {
                self.bv_solver = match value {
                    "bitblast" => BvSolverMode::Bitblast,
                    "prop" => BvSolverMode::Prop,
                    "preprop" => BvSolverMode::Preprop,
                    _ => return Err(usage_error(format!("invalid bv-solver mode '{value}'"))),
                }
            }
            "sat-solver" => {
                self.sat_solver = match value {
                    "cadical" => SatSolverMode::Cadical,
                    "cryptominisat" => SatSolverMode::Cryptominisat,
                    "kissat" => SatSolverMode::Kissat,
                    "lingeling" => SatSolverMode::Lingeling,
                    _ => return Err(usage_error(format!("invalid sat-solver mode '{value}'"))),
                }
            }
            "rewrite-level" => self.rewrite_level = numeric(value, REWRITE_LEVEL_MAX)?,
            "smt-comp-mode" => self.smt_comp_mode = boolean(value)?,
            "prop-const-bits" => self.prop_const_bits = boolean(value)?,
            "prop-ineq-bounds" => self.prop_ineq_bounds = boolean(value)?,
            "prop-nprops" => self.prop_nprops = numeric(value, u64::MAX)?,
            "prop-nupdates" => self.prop_nupdates = numeric(value, u64::MAX)?,
            "prop-path-sel" => {
                self.prop_path_sel = match value {
                    "essential" => PropPathSelection::Essential,
                    "random" => PropPathSelection::Random,
                    _ => return Err(usage_error(format!("invalid prop-path-sel mode '{value}'"))),
                }
            }
            "prop-prob-pick-inv-value" => {
                self.prop_prob_pick_inv_value = numeric(value, PROB_100)?;
            }
            "prop-prob-pick-random-input" => {
                self.prop_prob_pick_random_input = numeric(value, PROB_100)?;
            }
            "prop-sext" => self.prop_sext = boolean(value)?,
            "prop-opt-lt-concat-sext" => self.prop_opt_lt_concat_sext = boolean(value)?,
            "pp-contradicting-ands" => self.pp_contradicting_ands = boolean(value)?,
            "pp-elim-bv-extracts" => self.pp_elim_bv_extracts = boolean(value)?,
            "pp-embedded-constr" => self.pp_embedded_constr = boolean(value)?,
            "pp-flatten-and" => self.pp_flatten_and = boolean(value)?,
            "pp-normalize" => self.pp_normalize = boolean(value)?,
            "pp-normalize-share-aware" => self.pp_normalize_share_aware = boolean(value)?,
            "pp-skeleton-preproc" => self.pp_skeleton_preproc = boolean(value)?,
            "pp-variable-subst" => self.pp_variable_subst = boolean(value)?,
            "pp-variable-subst-norm-eq" => self.pp_variable_subst_norm_eq = boolean(value)?,
            "pp-variable-subst-norm-bv-ineq" => {
                self.pp_variable_subst_norm_bv_ineq = boolean(value)?;
            }
            _ => return Err(usage_error(format!("unknown option '{name}'"))),
        }
        Ok(())
    }

    /// Get an option's current value by long name, as a string.
    pub fn get(&self, name: &str) -> Result<String> {
        let v = match name {
            "incremental" => self.incremental.to_string(),
            "produce-models" => self.produce_models.to_string(),
            "produce-unsat-cores" => self.produce_unsat_cores.to_string(),
            "seed" => self.seed.to_string(),
            "verbosity" => self.verbosity.to_string(),
            "log-level" => self.log_level.to_string(),
            "bv-solver" => match self.bv_solver {
                BvSolverMode::Bitblast => "bitblast".into(),
                BvSolverMode::Prop => "prop".into(),
                BvSolverMode::Preprop => "preprop".into(),
            },
            "sat-solver" => match self.sat_solver {
                SatSolverMode::Cadical => "cadical".into(),
                SatSolverMode::Cryptominisat => "cryptominisat".into(),
                SatSolverMode::Kissat => "kissat".into(),
                SatSolverMode::Lingeling => "lingeling".into(),
            },
            "rewrite-level" => self.rewrite_level.to_string(),
            "smt-comp-mode" => self.smt_comp_mode.to_string(),
            "prop-const-bits" => self.prop_const_bits.to_string(),
            "prop-ineq-bounds" => self.prop_ineq_bounds.to_string(),
            "prop-nprops" => self.prop_nprops.to_string(),
            "prop-nupdates" => self.prop_nupdates.to_string(),
            "prop-path-sel" => match self.prop_path_sel {
                PropPathSelection::Essential => "essential".into(),
                PropPathSelection::Random => "random".into(),
            },
            "prop-prob-pick-inv-value" => self.prop_prob_pick_inv_value.to_string(),
            "prop-prob-pick-random-input" => self.prop_prob_pick_random_input.to_string(),
            "prop-sext" => self.prop_sext.to_string(),
            "prop-opt-lt-concat-sext" => self.prop_opt_lt_concat_sext.to_string(),
            "pp-contradicting-ands" => self.pp_contradicting_ands.to_string(),
            "pp-elim-bv-extracts" => self.pp_elim_bv_extracts.to_string(),
            "pp-embedded-constr" => self.pp_embedded_constr.to_string(),
            "pp-flatten-and" => self.pp_flatten_and.to_string(),
            "pp-normalize" => self.pp_normalize.to_string(),
            "pp-normalize-share-aware" => self.pp_normalize_share_aware.to_string(),
            "pp-skeleton-preproc" => self.pp_skeleton_preproc.to_string(),
            "pp-variable-subst" => self.pp_variable_subst.to_string(),
            "pp-variable-subst-norm-eq" => self.pp_variable_subst_norm_eq.to_string(),
            "pp-variable-subst-norm-bv-ineq" => self.pp_variable_subst_norm_bv_ineq.to_string(),
            _ => return Err(usage_error(format!("unknown option '{name}'"))),
        };
        Ok(v)
    }
}
