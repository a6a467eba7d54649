//! Rewrite Pass: apply the rewriter to every assertion.

use crate::preprocess::{AssertionSlice, PassCtx};
use ruzla_core::error::Result;

/// Applies the configured rewriter to each assertion.
#[derive(Debug, Default)]
pub struct PassRewrite;

impl PassRewrite {
    /// Rewrite every assertion in the slice.
    pub fn apply(&mut self, ctx: &mut PassCtx, slice: &mut AssertionSlice) -> Result<()> {
        for i in 0..slice.len() {
            let t = slice.get(i);
            let rewritten = ctx.rewriter.rewrite(ctx.tm, t)?;
            slice.replace(i, rewritten);
        }
        Ok(())
    }
}
