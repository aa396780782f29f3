//! Role assignment for worker identities.
//!
//! Exactly one identity is the Producer, exactly one (different) identity is
//! the Publisher, and every other identity is an Observer. A [`RoleLayout`]
//! can only be constructed when those three roles are all present, so the
//! dispatcher itself never has to handle a degenerate layout.

use std::fmt;

use crate::error::ConfigError;

/// Minimum worker count: one Producer, one Publisher, one Observer.
pub const MIN_WORKERS: usize = 3;

/// Conventional Producer identity.
pub const DEFAULT_PRODUCER: usize = 0;

/// Conventional Publisher identity: far from the Producer in CPU numbering,
/// so on most topologies the two do not share a core or cache.
pub const DEFAULT_PUBLISHER: usize = 4;

/// Behavior a worker performs on each activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Increments the counter.
    Producer,
    /// Publishes a counter snapshot into A then B across a write barrier.
    Publisher,
    /// Reads B then A across a read barrier and checks for staleness.
    Observer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Producer => "producer",
            Self::Publisher => "publisher",
            Self::Observer => "observer",
        })
    }
}

/// Validated mapping from worker identity to [`Role`].
///
/// # Example
///
/// ```rust
/// use mbtest::role::{Role, RoleLayout};
///
/// let layout = RoleLayout::new(8, 0, 4).unwrap();
/// assert_eq!(layout.role_of(0), Role::Producer);
/// assert_eq!(layout.role_of(4), Role::Publisher);
/// assert_eq!(layout.role_of(7), Role::Observer);
/// assert_eq!(layout.observers().count(), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleLayout {
    workers: usize,
    producer: usize,
    publisher: usize,
}

impl RoleLayout {
    /// Build a layout, failing fast when the three roles cannot be distinct.
    ///
    /// # Errors
    /// - [`ConfigError::TooFewWorkers`] when `workers < 3`.
    /// - [`ConfigError::RoleOutOfRange`] when either index is `>= workers`.
    /// - [`ConfigError::RoleCollision`] when `producer == publisher`.
    pub const fn new(workers: usize, producer: usize, publisher: usize) -> Result<Self, ConfigError> {
        if workers < MIN_WORKERS {
            return Err(ConfigError::TooFewWorkers {
                workers,
                required: MIN_WORKERS,
            });
        }
        if producer >= workers {
            return Err(ConfigError::RoleOutOfRange {
                role: Role::Producer,
                index: producer,
                workers,
            });
        }
        if publisher >= workers {
            return Err(ConfigError::RoleOutOfRange {
                role: Role::Publisher,
                index: publisher,
                workers,
            });
        }
        if producer == publisher {
            return Err(ConfigError::RoleCollision { index: producer });
        }

        Ok(Self {
            workers,
            producer,
            publisher,
        })
    }

    /// Conventional layout (Producer 0, Publisher 4) for `workers` identities.
    ///
    /// # Errors
    /// Same as [`RoleLayout::new`]; in particular fewer than five workers
    /// cannot host the conventional Publisher index.
    pub const fn conventional(workers: usize) -> Result<Self, ConfigError> {
        Self::new(workers, DEFAULT_PRODUCER, DEFAULT_PUBLISHER)
    }

    /// Total number of worker identities.
    #[inline]
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Producer identity.
    #[inline]
    #[must_use]
    pub const fn producer(&self) -> usize {
        self.producer
    }

    /// Publisher identity.
    #[inline]
    #[must_use]
    pub const fn publisher(&self) -> usize {
        self.publisher
    }

    /// The Role Dispatcher: identity to behavior.
    ///
    /// Identities outside `[0, workers)` never reach here from the
    /// controller; they map to [`Role::Observer`].
    #[inline]
    #[must_use]
    pub const fn role_of(&self, worker: usize) -> Role {
        if worker == self.producer {
            Role::Producer
        } else if worker == self.publisher {
            Role::Publisher
        } else {
            Role::Observer
        }
    }

    /// Identities that run the Observer role.
    pub fn observers(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.workers).filter(|&w| self.role_of(w) == Role::Observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_layout() {
        let layout = RoleLayout::conventional(8).expect("8 workers is enough");
        assert_eq!(layout.role_of(0), Role::Producer);
        assert_eq!(layout.role_of(4), Role::Publisher);
        for w in [1, 2, 3, 5, 6, 7] {
            assert_eq!(layout.role_of(w), Role::Observer);
        }
    }

    #[test]
    fn test_exactly_one_producer_and_publisher() {
        let layout = RoleLayout::new(16, 3, 11).expect("valid layout");
        let roles: Vec<Role> = (0..16).map(|w| layout.role_of(w)).collect();
        assert_eq!(roles.iter().filter(|r| **r == Role::Producer).count(), 1);
        assert_eq!(roles.iter().filter(|r| **r == Role::Publisher).count(), 1);
        assert_eq!(layout.observers().count(), 14);
    }

    #[test]
    fn test_too_few_workers() {
        assert_eq!(
            RoleLayout::new(2, 0, 1),
            Err(ConfigError::TooFewWorkers {
                workers: 2,
                required: MIN_WORKERS
            })
        );
    }

    #[test]
    fn test_conventional_publisher_needs_five_workers() {
        assert_eq!(
            RoleLayout::conventional(4),
            Err(ConfigError::RoleOutOfRange {
                role: Role::Publisher,
                index: 4,
                workers: 4
            })
        );
        assert!(RoleLayout::conventional(5).is_ok());
    }

    #[test]
    fn test_producer_out_of_range() {
        assert!(matches!(
            RoleLayout::new(3, 3, 1),
            Err(ConfigError::RoleOutOfRange {
                role: Role::Producer,
                ..
            })
        ));
    }

    #[test]
    fn test_collision_is_rejected() {
        assert_eq!(
            RoleLayout::new(6, 2, 2),
            Err(ConfigError::RoleCollision { index: 2 })
        );
    }

    #[test]
    fn test_minimum_layout_has_one_observer() {
        let layout = RoleLayout::new(3, 0, 2).expect("valid layout");
        assert_eq!(layout.observers().collect::<Vec<_>>(), vec![1]);
    }
}
