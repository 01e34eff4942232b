//! Config merge policy.

pub mod merge_policy;
