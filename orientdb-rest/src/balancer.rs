//! Node-selection strategies for session-bound calls

use crate::config::LoadBalancingMode;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Strategy that picks the node index for the next call
///
/// Implementations never see call outcomes; selection is independent of
/// success or failure. The returned index is always in `[0, pool_size)`.
pub trait LoadBalancer: Send + Sync + Debug {
    /// Return the node index to use for the next call
    fn select(&self) -> usize;

    /// Number of nodes this strategy was configured for
    fn pool_size(&self) -> usize;
}

/// Always selects the first node
///
/// Single-target behavior for deployments where failover distribution is not
/// desired.
#[derive(Debug)]
pub struct Sequence {
    size: usize,
}

impl Sequence {
    /// Create a sequence strategy for a pool of `size` nodes
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl LoadBalancer for Sequence {
    fn select(&self) -> usize {
        0
    }

    fn pool_size(&self) -> usize {
        self.size
    }
}

/// Cyclic rotation across all node indices
///
/// Selection `i` (0-indexed) yields `i mod size`, so every node is selected
/// once per `size` consecutive calls.
#[derive(Debug)]
pub struct RoundRobin {
    size: usize,
    cursor: AtomicUsize,
}

impl RoundRobin {
    /// Create a round-robin strategy for a pool of `size` nodes
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl LoadBalancer for RoundRobin {
    fn select(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.size
    }

    fn pool_size(&self) -> usize {
        self.size
    }
}

/// Instantiate the strategy selected by configuration
pub fn balancer_for(mode: LoadBalancingMode, size: usize) -> Box<dyn LoadBalancer> {
    match mode {
        LoadBalancingMode::Sequence => Box::new(Sequence::new(size)),
        LoadBalancingMode::RoundRobin => Box::new(RoundRobin::new(size)),
    }
}
