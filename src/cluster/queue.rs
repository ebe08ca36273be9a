//! Ordered queue of nearest-neighbour distances
//!
//! Every active cluster owns at most one record naming its current nearest
//! neighbour. Records live in an arena keyed by a stable handle; the ordered
//! set and both lookup tables store handles only, so removing a record never
//! invalidates references held elsewhere.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use super::point::ClusterId;

/// Distance between a cluster and its nearest neighbour
///
/// Records compare by distance only.
#[derive(Debug, Clone, Copy)]
pub struct MinimumDistance {
    cluster: ClusterId,
    nearest_neighbour: ClusterId,
    distance: f64,
}

impl MinimumDistance {
    pub fn new(cluster: ClusterId, nearest_neighbour: ClusterId, distance: f64) -> Self {
        MinimumDistance {
            cluster,
            nearest_neighbour,
            distance,
        }
    }

    pub fn cluster(&self) -> ClusterId {
        self.cluster
    }

    pub fn nearest_neighbour(&self) -> ClusterId {
        self.nearest_neighbour
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }
}

impl PartialEq for MinimumDistance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MinimumDistance {}

impl PartialOrd for MinimumDistance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MinimumDistance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance)
    }
}

/// Stable handle of a record in the queue
type Handle = u64;

/// Ascending multi-set of distance records with reverse lookups
///
/// Equal distances are all kept and leave the queue in insertion order.
#[derive(Debug, Default)]
pub struct DistanceQueue {
    records: HashMap<Handle, MinimumDistance>,
    order: BTreeSet<(MinimumDistance, Handle)>,
    /// neighbour id -> records naming it as nearest neighbour
    reverse_nns: HashMap<ClusterId, Vec<Handle>>,
    /// cluster id -> its outgoing record
    by_cluster: HashMap<ClusterId, Handle>,
    next_handle: Handle,
}

impl DistanceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Queues a record, replacing any record the same cluster still owns
    pub fn insert(&mut self, record: MinimumDistance) {
        self.remove_for_cluster(record.cluster);

        let handle = self.next_handle;
        self.next_handle += 1;

        self.records.insert(handle, record);
        self.order.insert((record, handle));
        self.reverse_nns
            .entry(record.nearest_neighbour)
            .or_default()
            .push(handle);
        self.by_cluster.insert(record.cluster, handle);
    }

    /// Smallest record without removing it
    #[cfg(test)]
    pub fn peek(&self) -> Option<&MinimumDistance> {
        self.order.first().map(|(record, _)| record)
    }

    /// Removes and returns the smallest record
    pub fn pop(&mut self) -> Option<MinimumDistance> {
        let &(_, handle) = self.order.first()?;
        self.remove(handle)
    }

    /// Outgoing record of `cluster`, if any
    #[cfg(test)]
    pub fn get(&self, cluster: ClusterId) -> Option<&MinimumDistance> {
        self.by_cluster
            .get(&cluster)
            .and_then(|handle| self.records.get(handle))
    }

    /// Removes the outgoing record of `cluster`
    pub fn remove_for_cluster(&mut self, cluster: ClusterId) -> Option<MinimumDistance> {
        let handle = *self.by_cluster.get(&cluster)?;
        self.remove(handle)
    }

    /// Removes every record naming `neighbour` as nearest neighbour
    pub fn remove_pointing_at(&mut self, neighbour: ClusterId) -> Vec<MinimumDistance> {
        let handles = self.reverse_nns.remove(&neighbour).unwrap_or_default();
        handles
            .into_iter()
            .filter_map(|handle| self.remove(handle))
            .collect()
    }

    /// Number of records naming `neighbour` as nearest neighbour
    #[cfg(test)]
    pub fn count_pointing_at(&self, neighbour: ClusterId) -> usize {
        self.reverse_nns.get(&neighbour).map_or(0, Vec::len)
    }

    fn remove(&mut self, handle: Handle) -> Option<MinimumDistance> {
        let record = self.records.remove(&handle)?;
        self.order.remove(&(record, handle));

        if let Some(handles) = self.reverse_nns.get_mut(&record.nearest_neighbour) {
            handles.retain(|&h| h != handle);
            if handles.is_empty() {
                self.reverse_nns.remove(&record.nearest_neighbour);
            }
        }
        if self.by_cluster.get(&record.cluster) == Some(&handle) {
            self.by_cluster.remove(&record.cluster);
        }

        Some(record)
    }
}
