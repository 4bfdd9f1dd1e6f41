//! Commit analysis: bump classification and release notes

pub mod classifier;
pub mod notes;

pub use classifier::{CommitClassifier, ConventionalClassifier};
pub use notes::release_notes;
