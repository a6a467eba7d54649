//! Property-based testing entry point for ruzla-core.

mod property_tests;
