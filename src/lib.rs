//! Frontera - costly-access analysis for candidate microservice decompositions
//!
//! Given a decomposition of a monolith's entities into clusters and, for each
//! controller, the ordered trace of entity accesses it performs, this library
//! finds the accesses that carry real cost under the decomposition: first
//! touches, read→write escalations inside a cluster, and every crossing of a
//! cluster boundary.

pub mod accumulator;
pub mod cli;
pub mod complexity;
pub mod config;
pub mod coordinator;
pub mod decomposition;
pub mod error;
pub mod filter;
pub mod mode;
pub mod report;
pub mod scanner;
pub mod trace;
