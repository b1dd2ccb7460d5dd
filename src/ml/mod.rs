//! Model training and evaluation.
//!
//! Everything here is pure computation; persistence and run tracking live in
//! [`crate::tracking`].

pub mod gbdt;
pub mod metrics;
