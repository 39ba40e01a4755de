//! Command implementations for the minimerge CLI

pub mod merge;
