//! Ruzla Core - Values, Terms, Sorts, Rewriting and Printing.
//!
//! This crate provides the foundational types for the Ruzla SMT solver:
//! - Arbitrary-width [`BitVector`] values with the full SMT-LIB operation set
//! - IEEE 754 [`FloatingPoint`] values parameterized by exponent/significand width
//! - Hash-consed sorts and terms managed by a [`TermManager`]
//! - A kind-dispatched [`Rewriter`] with configurable intensity
//! - SMT-LIB v2 printing with let-factorization of shared sub-DAGs
//! - The solver [`Options`] record
//!
//! # Examples
//!
//! ## Creating terms
//!
//! ```
//! use ruzla_core::{Kind, TermManager};
//!
//! let mut tm = TermManager::new();
//! let bv8 = tm.mk_bv_sort(8).unwrap();
//! let x = tm.mk_const(bv8, Some("x"));
//! let one = tm.mk_bv_value_u64(bv8, 1).unwrap();
//! let sum = tm.mk_term(Kind::BvAdd, &[x, one], &[]).unwrap();
//! assert_eq!(tm.sort(sum), bv8);
//! ```
//!
//! ## Rewriting
//!
//! ```
//! use ruzla_core::{Kind, Rewriter, TermManager};
//!
//! let mut tm = TermManager::new();
//! let bv4 = tm.mk_bv_sort(4).unwrap();
//! let a = tm.mk_bv_value_u64(bv4, 3).unwrap();
//! let b = tm.mk_bv_value_u64(bv4, 5).unwrap();
//! let sum = tm.mk_term(Kind::BvAdd, &[a, b], &[]).unwrap();
//!
//! let mut rw = Rewriter::new(1);
//! let folded = rw.rewrite(&mut tm, sum).unwrap();
//! assert_eq!(tm.value(folded).unwrap().as_bitvector().unwrap().to_u64(), Some(8));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bv;
pub mod error;
pub mod fp;
pub mod node;
pub mod options;
pub mod printer;
pub mod rewrite;
pub mod sort;

pub use bv::BitVector;
pub use error::{Error, Result};
pub use fp::{FloatingPoint, FpFormat, RoundingMode};
pub use node::{Kind, TermId, TermManager, Value};
pub use options::{BvSolverMode, Options, PropPathSelection, SatSolverMode};
pub use rewrite::Rewriter;
pub use sort::{SortId, SortKind};
