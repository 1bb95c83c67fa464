//! Duplicate matching primitives
//!
//! - `metrics`: edit distance and longest common substring
//! - `classifier`: length-only admissibility gate and the exact match rule
//! - `partition`: splitting candidate lists into worker batches

pub mod classifier;
pub mod metrics;
pub mod partition;

pub use classifier::MatchClassifier;
pub use metrics::{edit_distance, longest_common_substring_length, score};
pub use partition::{batch_count, divide, partition};
