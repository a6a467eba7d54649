//! Property-based test modules.

mod bv_properties;
mod rewriter_properties;
mod term_properties;
