//! Preprocessing Passes.
//!
//! Each pass is a struct with an `apply` over one level's assertions,
//! idempotent in isolation, reporting modifications through the slice.

mod contradicting_ands;
mod elim_lambda;
mod elim_uninterpreted;
mod embedded;
mod flatten_and;
mod normalize;
mod rewrite;
mod skeleton;
mod skolemize;
mod variable_subst;

pub use contradicting_ands::PassContradictingAnds;
pub use elim_lambda::PassElimLambda;
pub use elim_uninterpreted::PassElimUninterpreted;
pub use embedded::PassEmbeddedConstraints;
pub use flatten_and::PassFlattenAnd;
pub use normalize::PassNormalize;
pub use rewrite::PassRewrite;
pub use skeleton::PassSkeletonPreproc;
pub use skolemize::PassSkolemize;
pub use variable_subst::PassVariableSubstitution;
