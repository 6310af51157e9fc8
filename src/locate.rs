//! Best-effort geolocation.
//!
//! Position lookup is an environment concern, so it sits behind a trait.
//! Failures are never fatal: the flow falls back to the default coordinate
//! and the form stays usable.

use async_trait::async_trait;

use crate::draft::Coordinate;
use crate::error::{ColetaError, Result};

/// Source of the user's current position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Resolve the current position.
    ///
    /// # Errors
    ///
    /// `GeolocationUnavailable` when no position can be determined.
    async fn locate(&self) -> Result<Coordinate>;
}

/// Geolocator returning a fixed, known position.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator {
    position: Coordinate,
}

impl FixedGeolocator {
    pub fn new(position: Coordinate) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<Coordinate> {
        Ok(self.position)
    }
}

/// Geolocator for environments with no position source at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGeolocator;

#[async_trait]
impl Geolocator for UnavailableGeolocator {
    async fn locate(&self) -> Result<Coordinate> {
        Err(ColetaError::GeolocationUnavailable(
            "no position source configured".to_string(),
        ))
    }
}
