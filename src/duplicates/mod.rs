//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Fingerprint grouping with deterministic canonical selection
//! - Line-overlap near-duplicate detection (deep scan)
//! - The persisted duplicate database

pub mod database;
pub mod groups;
pub mod similarity;

pub use database::{DuplicateDatabase, GroupEntry, RegistryEntry};
pub use groups::{group_duplicates, DuplicateGroup, GroupingStats};
pub use similarity::{
    find_near_duplicates, line_similarity, Classification, SimilarityEdge,
    NEAR_DUPLICATE_THRESHOLD,
};
