//! Place name → coordinate → weather + air quality, published as one result.

use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    error::{FetchError, OrchestrationError, Stage},
    model::{Coordinate, LocationReport, SavedPlace},
    provider::Providers,
    store::SavedPlacesStore,
};

/// Failure of the most recent call, in a form observers can clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFailure {
    pub place_name: String,
    pub stage: Stage,
    pub message: String,
    pub retryable: bool,
}

/// What observers see. A failed call never clears `last_success`.
#[derive(Debug, Clone, Default)]
pub struct PublishedState {
    pub last_success: Option<Arc<LocationReport>>,
    pub last_failure: Option<PublishedFailure>,
    /// Completed orchestration calls so far.
    pub completed: u64,
}

impl PublishedState {
    pub fn is_failed(&self) -> bool {
        self.last_failure.is_some()
    }
}

#[derive(Debug)]
pub struct LocationOrchestrator {
    providers: Providers,
    state: watch::Sender<PublishedState>,
}

impl LocationOrchestrator {
    pub fn new(providers: Providers) -> Self {
        let (state, _) = watch::channel(PublishedState::default());
        Self { providers, state }
    }

    /// Geocode `place_name`, then fetch weather and air quality for it.
    ///
    /// Both fetches run concurrently. The combined report is published only
    /// when both succeed; otherwise the first failure is published with its
    /// stage and the previous report stays in place. Overlapping calls are
    /// not queued: whichever finishes last owns the published slot.
    pub async fn resolve_and_fetch(
        &self,
        place_name: &str,
    ) -> Result<Arc<LocationReport>, OrchestrationError> {
        let name = place_name.trim();
        tracing::debug!("Resolving '{}'", name);

        let outcome = match self.providers.geocoder.resolve(name).await {
            Ok(coordinate) => self.fetch_both(name, coordinate).await,
            Err(e) => Err(OrchestrationError::GeocodeFailed(e)),
        };

        self.publish(name, &outcome);
        outcome
    }

    /// Same as [`resolve_and_fetch`](Self::resolve_and_fetch) for a place
    /// whose coordinate is already known, so geocoding is skipped.
    pub async fn fetch_saved(
        &self,
        place: &SavedPlace,
    ) -> Result<Arc<LocationReport>, OrchestrationError> {
        let outcome = self.fetch_both(&place.name, place.coordinate).await;
        self.publish(&place.name, &outcome);
        outcome
    }

    async fn fetch_both(
        &self,
        name: &str,
        coordinate: Coordinate,
    ) -> Result<Arc<LocationReport>, OrchestrationError> {
        let weather = async {
            self.providers
                .weather
                .fetch(coordinate)
                .await
                .map_err(OrchestrationError::WeatherFetchFailed)
        };
        let air_quality = async {
            self.providers
                .air_quality
                .fetch(coordinate)
                .await
                .map_err(OrchestrationError::AirQualityFetchFailed)
        };

        let (weather, air_quality) = tokio::try_join!(weather, air_quality)?;

        Ok(Arc::new(LocationReport {
            place_name: name.to_string(),
            coordinate,
            weather,
            air_quality,
        }))
    }

    fn publish(&self, name: &str, outcome: &Result<Arc<LocationReport>, OrchestrationError>) {
        self.state.send_modify(|state| {
            state.completed += 1;
            match outcome {
                Ok(report) => {
                    tracing::info!(
                        "Published weather for '{}' at {}",
                        report.place_name,
                        report.coordinate
                    );
                    state.last_success = Some(Arc::clone(report));
                    state.last_failure = None;
                }
                Err(e) => {
                    tracing::info!("Lookup for '{}' failed at {} stage: {}", name, e.stage(), e);
                    state.last_failure = Some(PublishedFailure {
                        place_name: name.to_string(),
                        stage: e.stage(),
                        message: e.to_string(),
                        retryable: e.cause().is_retryable(),
                    });
                }
            }
        });
    }

    /// Snapshot of the published state.
    pub fn current(&self) -> PublishedState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PublishedState> {
        self.state.subscribe()
    }

    /// Drop the last report and failure; observers see an empty state.
    pub fn clear(&self) {
        self.state.send_modify(|state| {
            state.last_success = None;
            state.last_failure = None;
        });
    }

    /// Save the currently published place, along with its present condition.
    /// Returns `false` when nothing is published or the name is already saved.
    pub fn save_current(&self, store: &mut SavedPlacesStore) -> bool {
        let Some(report) = self.state.borrow().last_success.clone() else {
            return false;
        };

        store.add_with_condition(
            &report.place_name,
            report.coordinate,
            Some(report.weather.current.primary_condition.clone()),
        )
    }
}

/// Whether an error from `resolve_and_fetch` means the place does not exist,
/// as opposed to a failure worth retrying.
pub fn is_unknown_place(err: &OrchestrationError) -> bool {
    matches!(
        err,
        OrchestrationError::GeocodeFailed(FetchError::NotFound { .. })
    )
}
