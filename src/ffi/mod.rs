//! Python bindings, compiled only with the `python` feature.

pub mod ioadapters;
pub mod python;
