//! Ruzla Solver - Preprocessing, Bit-Blasting and the Solving Context.
//!
//! This crate turns assertions into answers:
//!
//! - [`backtrack`]: scope management and the assertion stack
//! - [`preprocess`]: semantics-preserving passes run to fixed point
//! - [`aig`]: the and-inverter graph and its Tseitin CNF encoder
//! - [`bitblast`]: bit-vector terms to AIG circuits
//! - [`wordblast`]: floating-point terms to packed bit-vector circuits
//! - [`fun`]: lazy congruence for uninterpreted functions and arrays
//! - [`quant`]: quantifier detection and skolemization
//! - [`model`]: model extraction and term evaluation
//! - [`context`]: the [`SolvingContext`] facade
//!
//! # Examples
//!
//! ```
//! use ruzla_core::{Kind, Options};
//! use ruzla_solver::{SolverResult, SolvingContext};
//!
//! let mut ctx = SolvingContext::new(Options::default());
//! let bv8 = ctx.tm().mk_bv_sort(8).unwrap();
//! let x = ctx.tm().mk_const(bv8, Some("x"));
//! let zero = ctx.tm().mk_bv_zero(bv8).unwrap();
//! let gt = ctx.tm().mk_term(Kind::BvUlt, &[zero, x], &[]).unwrap();
//! ctx.assert_formula(gt).unwrap();
//! assert_eq!(ctx.check_sat(), SolverResult::Sat);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aig;
pub mod backtrack;
pub mod bitblast;
pub mod context;
pub mod fun;
pub mod model;
pub mod preprocess;
pub mod quant;
pub mod wordblast;

pub use backtrack::{AssertionStack, BacktrackManager, Backtrackable};
pub use context::{SolverResult, SolvingContext, Statistics};

/// Cooperative cancellation predicate, polled before every potentially
/// long loop iteration (preprocessing pass, bit-blasting chunk, SAT
/// round). Returning `true` aborts the operation with
/// [`SolverResult::Unknown`].
pub trait Terminate {
    /// True if the current operation should abort.
    fn terminated(&mut self) -> bool;
}

impl<F: FnMut() -> bool> Terminate for F {
    fn terminated(&mut self) -> bool {
        self()
    }
}
