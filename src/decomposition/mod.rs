// Decomposition model: candidate microservice clusters and entity lookup
//
// A decomposition assigns every persistent entity of the monolith to one
// cluster. It is built once from the decomposition source, never mutated
// afterwards, and shared by reference with every controller scan.
//
// Entities missing from the decomposition resolve to `ClusterKey::Unknown`,
// an explicit bucket that cannot collide with a real cluster id.

mod model;
mod source;

pub use model::{Cluster, ClusterId, ClusterKey, Decomposition, EntityId};
