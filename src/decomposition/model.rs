use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a persistent entity (domain object / table)
pub type EntityId = i64;

/// Identifier of a cluster (candidate microservice)
pub type ClusterId = i64;

/// Resolved cluster of an access
///
/// `Unknown` is the bucket for entities the decomposition does not assign.
/// It is a separate variant, so it never compares equal to a real cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClusterKey {
    Known(ClusterId),
    Unknown,
}

impl ClusterKey {
    /// Cluster id, if the entity was assigned
    pub fn id(self) -> Option<ClusterId> {
        match self {
            ClusterKey::Known(id) => Some(id),
            ClusterKey::Unknown => None,
        }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKey::Known(id) => write!(f, "{}", id),
            ClusterKey::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for ClusterKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClusterKey::Known(id) => serializer.serialize_i64(*id),
            ClusterKey::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// A cluster and the entities it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub entities: Vec<EntityId>,
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cluster(id: {}, entities: {:?})", self.id, self.entities)
    }
}

/// Immutable assignment of entities to clusters
///
/// # Example
/// ```
/// use frontera::decomposition::{ClusterKey, Decomposition};
///
/// let decomposition = Decomposition::from_clusters([(0, vec![1, 2]), (1, vec![3])]);
/// assert_eq!(decomposition.cluster_of(3), Some(1));
/// assert_eq!(decomposition.cluster_key(42), ClusterKey::Unknown);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Decomposition {
    clusters: Vec<Cluster>,

    /// Fast lookup: entity id → cluster id
    entity_to_cluster: HashMap<EntityId, ClusterId>,
}

impl Decomposition {
    /// Build the model by inverting cluster membership lists
    ///
    /// An entity listed in more than one cluster is not an error: the mapping
    /// seen last in iteration order wins and a warning is logged.
    pub fn from_clusters<I>(clusters: I) -> Self
    where
        I: IntoIterator<Item = (ClusterId, Vec<EntityId>)>,
    {
        let mut decomposition = Self::default();

        for (id, entities) in clusters {
            for &entity in &entities {
                if let Some(previous) = decomposition.entity_to_cluster.insert(entity, id) {
                    if previous != id {
                        tracing::warn!(
                            "Entity {} listed in clusters {} and {}; keeping {}",
                            entity,
                            previous,
                            id,
                            id
                        );
                    }
                }
            }
            decomposition.clusters.push(Cluster { id, entities });
        }

        tracing::debug!(
            "Decomposition built: {} clusters, {} entities",
            decomposition.clusters.len(),
            decomposition.entity_to_cluster.len()
        );

        decomposition
    }

    /// Cluster owning `entity`, if any
    pub fn cluster_of(&self, entity: EntityId) -> Option<ClusterId> {
        self.entity_to_cluster.get(&entity).copied()
    }

    /// Cluster key for `entity`, `Unknown` if it is not assigned
    pub fn cluster_key(&self, entity: EntityId) -> ClusterKey {
        self.cluster_of(entity)
            .map_or(ClusterKey::Unknown, ClusterKey::Known)
    }

    /// Get cluster by id
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// Get all clusters, in source order
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Number of distinct assigned entities
    pub fn entity_count(&self) -> usize {
        self.entity_to_cluster.len()
    }
}
