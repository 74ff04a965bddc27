//! Request extractors.

pub mod target;
