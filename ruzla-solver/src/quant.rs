//! Quantifier Handling.
//!
//! Instantiation-based quantifier reasoning is out of scope: asserted
//! existentials are skolemized by the preprocessor, and any quantifier
//! that survives preprocessing makes `check_sat` answer `Unknown`.

use ruzla_core::{Kind, TermId, TermManager};
use rustc_hash::FxHashSet;

/// True if any term in `roots` contains a quantifier.
#[must_use]
pub fn contains_quantifier<I>(tm: &TermManager, roots: I) -> bool
where
    I: IntoIterator<Item = TermId>,
{
    let mut seen: FxHashSet<TermId> = FxHashSet::default();
    let mut stack: Vec<TermId> = roots.into_iter().collect();
    while let Some(cur) = stack.pop() {
        if !seen.insert(cur) {
            continue;
        }
        if matches!(tm.kind(cur), Kind::Forall | Kind::Exists) {
            return true;
        }
        stack.extend(tm.children(cur).iter().copied());
    }
    false
}
