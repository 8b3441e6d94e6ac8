//! In-memory obstacle registry using DashMap.
//!
//! Static obstacles are stored as-is. Moving obstacles are stored as a
//! single-slot `watch` cell that their feed overwrites; readers always see the
//! latest sample and never wait on the feed.

use avoid_core::models::Location;
use avoid_core::obstacle::{MovingObstacle, Obstacle, ObstacleError, StaticObstacle};
use avoid_core::rules::AvoidanceRules;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("obstacle {0} is already registered")]
    Duplicate(String),
    #[error(transparent)]
    InvalidObstacle(#[from] ObstacleError),
}

/// Latest position reported for a moving obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObstacleSample {
    pub location: Location,
    pub received_at: DateTime<Utc>,
}

impl ObstacleSample {
    /// Samples older than this are still avoided but reported as stale.
    pub const STALE_AFTER_MS: i64 = 2_000;

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.received_at)
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > Duration::milliseconds(Self::STALE_AFTER_MS)
    }
}

/// Write side of a moving obstacle's position cell.
#[derive(Debug)]
pub struct MovingFeed {
    id: String,
    sender: watch::Sender<Option<ObstacleSample>>,
}

impl MovingFeed {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the obstacle's position. Non-finite positions are dropped so a
    /// bad sample never replaces a good one.
    pub fn publish(&self, location: Location) {
        if !location.is_finite() {
            tracing::warn!("Dropping non-finite sample for obstacle {}", self.id);
            return;
        }
        self.sender.send_replace(Some(ObstacleSample {
            location,
            received_at: Utc::now(),
        }));
    }
}

enum Entry {
    Static(StaticObstacle),
    Moving {
        radius_m: f64,
        buffer_m: f64,
        latest: watch::Receiver<Option<ObstacleSample>>,
    },
}

/// Obstacle as seen at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnownObstacle {
    pub id: String,
    pub obstacle: Obstacle,
}

/// Thread-safe store for every obstacle the monitor avoids.
pub struct ObstacleRegistry {
    rules: AvoidanceRules,
    obstacles: DashMap<String, Entry>,
}

impl ObstacleRegistry {
    pub fn new(rules: AvoidanceRules) -> Self {
        Self {
            rules,
            obstacles: DashMap::new(),
        }
    }

    /// Register a fixed cylinder centered vertically on `location.alt`.
    pub fn register_static(
        &self,
        id: &str,
        location: Location,
        radius_m: f64,
        height_m: f64,
    ) -> Result<(), RegistryError> {
        let obstacle =
            StaticObstacle::new(location, radius_m, height_m, self.rules.static_buffer_m)?;
        self.insert(id, Entry::Static(obstacle))?;
        tracing::info!("Registered static obstacle {}", id);
        Ok(())
    }

    /// Register a moving sphere. It is ignored until its feed publishes a
    /// first position.
    pub fn register_moving(&self, id: &str, radius_m: f64) -> Result<MovingFeed, RegistryError> {
        // Validate the shape up front; the position is a placeholder.
        MovingObstacle::new(Location::new(0.0, 0.0, 0.0), radius_m, self.rules.moving_buffer_m)?;

        let (sender, latest) = watch::channel(None);
        self.insert(
            id,
            Entry::Moving {
                radius_m,
                buffer_m: self.rules.moving_buffer_m,
                latest,
            },
        )?;
        tracing::info!("Registered moving obstacle {}", id);
        Ok(MovingFeed {
            id: id.to_string(),
            sender,
        })
    }

    fn insert(&self, id: &str, entry: Entry) -> Result<(), RegistryError> {
        match self.obstacles.entry(id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RegistryError::Duplicate(id.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        self.obstacles.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Latest sample of a moving obstacle, if it has reported one.
    pub fn latest_sample(&self, id: &str) -> Option<ObstacleSample> {
        match self.obstacles.get(id)?.value() {
            Entry::Moving { latest, .. } => *latest.borrow(),
            Entry::Static(_) => None,
        }
    }

    /// Every obstacle with a known position, ordered by id. A moving obstacle
    /// whose feed went quiet keeps its last position.
    pub fn snapshot(&self) -> Vec<KnownObstacle> {
        let now = Utc::now();
        let mut known: Vec<KnownObstacle> = self
            .obstacles
            .iter()
            .filter_map(|entry| {
                let obstacle = match entry.value() {
                    Entry::Static(obstacle) => Obstacle::Static(obstacle.clone()),
                    Entry::Moving {
                        radius_m,
                        buffer_m,
                        latest,
                    } => {
                        let sample = (*latest.borrow())?;
                        if sample.is_stale(now) {
                            tracing::debug!(
                                "Obstacle {} last reported {} ms ago",
                                entry.key(),
                                sample.age(now).num_milliseconds()
                            );
                        }
                        Obstacle::Moving(
                            MovingObstacle::new(sample.location, *radius_m, *buffer_m).ok()?,
                        )
                    }
                };
                Some(KnownObstacle {
                    id: entry.key().clone(),
                    obstacle,
                })
            })
            .collect();
        known.sort_by(|a, b| a.id.cmp(&b.id));
        known
    }
}

impl Default for ObstacleRegistry {
    fn default() -> Self {
        Self::new(AvoidanceRules::default())
    }
}
