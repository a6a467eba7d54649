//! Ruzla SAT - Embedded CDCL Engine.
//!
//! The rest of the workspace programs against the [`SatSolver`] port; the
//! [`Cdcl`] engine implements it with two-watched-literal propagation,
//! first-UIP clause learning, activity-based decisions, Luby restarts,
//! phase saving and incremental assumptions with failed-assumption cores.
//!
//! The configured `sat-solver` mode names are accepted for compatibility
//! and all resolve to the embedded engine via [`new_engine`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod lit;
mod rng;
mod solver;

pub use lit::{Lit, Var};
pub use rng::XorShift64;
pub use solver::{Cdcl, SatResult, SatSolver};

use ruzla_core::options::SatSolverMode;

/// Create the SAT engine configured by `mode`.
///
/// External backends are not linked; every mode resolves to the embedded
/// CDCL engine seeded with `seed`.
#[must_use]
pub fn new_engine(mode: SatSolverMode, seed: u64) -> Cdcl {
    let _ = mode;
    Cdcl::with_seed(seed)
}
