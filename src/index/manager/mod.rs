
use std::time::Duration;
use tracing::{debug, info};

use super::{Metric, VectorIndexClient};
use crate::Result;
use crate::config::{validate_dimension, validate_index_name};

/// What [`IndexManager::ensure_index`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    AlreadyExists,
    Created,
}

/// Makes sure the named index exists before anything is written to it
#[derive(Debug, Clone)]
pub struct IndexManager {
    ready_delay: Duration,
}

impl Default for IndexManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl IndexManager {
    #[inline]
    pub fn new(ready_delay: Duration) -> Self {
        Self { ready_delay }
    }

    #[inline]
    pub fn ready_delay(&self) -> Duration {
        self.ready_delay
    }

    /// Create the index when absent, then wait for it to come up.
    ///
    /// Arguments are validated before any call reaches the client. The wait
    /// is a fixed delay; readiness is never polled.
    pub async fn ensure_index(
        &self,
        client: &dyn VectorIndexClient,
        name: &str,
        dimension: u32,
        metric: Metric,
    ) -> Result<EnsureOutcome> {
        validate_index_name(name)?;
        validate_dimension(dimension)?;

        let existing = client.list_index_names().await?;
        if existing.contains(name) {
            debug!("Index '{}' already exists", name);
            return Ok(EnsureOutcome::AlreadyExists);
        }

        info!(
            "Creating index '{}' (dimension {}, metric {})",
            name, dimension, metric
        );
        client.create_index(name, dimension, metric).await?;

        if !self.ready_delay.is_zero() {
            info!(
                "Waiting {:?} for index '{}' to initialize",
                self.ready_delay, name
            );
            tokio::time::sleep(self.ready_delay).await;
        }

        info!("Index '{}' created", name);
        Ok(EnsureOutcome::Created)
    }
}
