//! Orchestration of the point-registration flow.
//!
//! [`PointRegistrationFlow`] owns the three service clients and drives a
//! [`Session`] through its stages. Interactive callers run the event pump
//! ([`run`](PointRegistrationFlow::run)): edits apply synchronously, city
//! lookups and the post run as tasks whose results re-enter the same loop,
//! and the session is only ever touched from that loop. Non-interactive
//! callers can drive the steps directly with
//! [`initialize`](PointRegistrationFlow::initialize) /
//! [`fetch_cities`](PointRegistrationFlow::fetch_cities) /
//! [`submit`](PointRegistrationFlow::submit).

pub mod transitions;
pub mod types;

pub use types::{
    CityFetch, CityList, CityResolution, FlowEvent, FlowUpdate, Initializing, Ready, Session,
    SessionData, SessionId, SessionStatus, Stage, Submitting, SubmissionOutcome, Succeeded,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::catalog::ItemCatalogClient;
use crate::draft::Coordinate;
use crate::error::Result;
use crate::geo::GeoLookupClient;
use crate::http::HttpClient;
use crate::locate::Geolocator;
use crate::submit::SubmissionBuilder;

/// Configuration for a registration flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Base URL of the collection-point backend.
    pub backend_url: String,
    /// Base URL of the localities service used for UF and city lookups.
    pub locality_url: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3333".to_string(),
            locality_url: "https://servicodados.ibge.gov.br/api/v1/localidades".to_string(),
        }
    }
}

/// What the pump holds between events.
enum PumpStage {
    Ready(Session<Ready>),
    Submitting(Session<Submitting>),
}

/// Results re-entering the pump from spawned tasks.
enum TaskOutput {
    Cities(CityList),
    Submitted(Result<()>),
}

#[derive(Debug, Default)]
struct FlowStats {
    city_lists_applied: u64,
    city_lists_discarded: u64,
    submissions_failed: u64,
}

/// Orchestrator for registration sessions.
pub struct PointRegistrationFlow<H, L>
where
    H: HttpClient,
    L: Geolocator,
{
    catalog: ItemCatalogClient<H>,
    geo: GeoLookupClient<H>,
    submitter: SubmissionBuilder<H>,
    locator: L,
}

impl<H, L> PointRegistrationFlow<H, L>
where
    H: HttpClient + 'static,
    L: Geolocator + 'static,
{
    pub fn new(http: H, locator: L, config: FlowConfig) -> Self {
        tracing::debug!(
            backend_url = %config.backend_url,
            locality_url = %config.locality_url,
            "Creating registration flow"
        );
        Self {
            catalog: ItemCatalogClient::new(http.clone(), config.backend_url.clone()),
            geo: GeoLookupClient::new(http.clone(), config.locality_url),
            submitter: SubmissionBuilder::new(http, config.backend_url),
            locator,
        }
    }

    /// Load everything the form needs and enter Ready.
    ///
    /// Geolocation, the item catalog and the UF list load concurrently and
    /// none of them blocks another. Each failure degrades to a default (the
    /// origin coordinate, an empty list), so the form always opens.
    pub async fn initialize(&self) -> Session<Ready> {
        let session = Session::start();
        tracing::info!(session_id = %session.data.id, "Initializing registration session");

        let (position, catalog, states) =
            tokio::join!(self.locator.locate(), self.catalog.list(), self.geo.states());

        let position = position.unwrap_or_else(|error| {
            tracing::warn!(
                session_id = %session.data.id,
                error = %error,
                "Geolocation unavailable, using default position"
            );
            Coordinate::default()
        });
        let catalog = catalog.unwrap_or_else(|error| {
            tracing::warn!(
                session_id = %session.data.id,
                error = %error,
                "Item catalog unavailable, starting empty"
            );
            Vec::new()
        });
        let states = states.unwrap_or_else(|error| {
            tracing::warn!(
                session_id = %session.data.id,
                error = %error,
                "UF list unavailable, starting empty"
            );
            Vec::new()
        });

        let ready = session.ready(position, catalog, states);
        tracing::info!(
            session_id = %ready.data.id,
            catalog_count = ready.state.catalog.len(),
            state_count = ready.state.states.len(),
            "Registration form ready"
        );
        ready
    }

    /// Run one tagged city lookup.
    pub async fn fetch_cities(&self, fetch: CityFetch) -> CityList {
        let result = self.geo.cities(&fetch.uf).await;
        CityList {
            uf: fetch.uf,
            result,
        }
    }

    /// Post a ready session once and map the outcome.
    pub async fn submit(&self, session: Session<Ready>) -> SubmissionOutcome {
        let submitting = session.begin_submission();
        let result = self.submitter.submit(&submitting.state.draft).await;
        submitting.complete(result)
    }

    /// Drive a whole session as an event pump.
    ///
    /// City lookups are never aborted; a result whose tag no longer matches
    /// the current selection is discarded when it lands. While a post is in
    /// flight, edits and further submit events are ignored, never queued or
    /// double-posted.
    ///
    /// Ends when the point is registered, `shutdown` fires, or either
    /// channel peer goes away.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<FlowEvent>,
        updates: mpsc::Sender<FlowUpdate>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let ready = self.initialize().await;
        let session_id = ready.data.id;

        let loaded = FlowUpdate::Loaded {
            catalog: ready.state.catalog.clone(),
            states: ready.state.states.clone(),
            position: ready.state.draft.position,
        };
        if updates.send(loaded).await.is_err() {
            tracing::debug!(session_id = %session_id, "Update receiver dropped before the form opened");
            return Ok(());
        }

        let mut stage = PumpStage::Ready(ready);
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();
        let mut stats = FlowStats::default();

        let outcome: Result<()> = loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(session_id = %session_id, "Shutdown requested, stopping flow");
                    break Ok(());
                }

                event = events.recv() => {
                    match event {
                        Some(FlowEvent::Edit(edit)) => match &mut stage {
                            PumpStage::Ready(session) => {
                                if let Some(fetch) = session.apply(edit) {
                                    tracing::debug!(
                                        session_id = %session_id,
                                        uf = %fetch.uf,
                                        "City lookup scheduled"
                                    );
                                    let flow = Arc::clone(&self);
                                    tasks.spawn(async move {
                                        TaskOutput::Cities(flow.fetch_cities(fetch).await)
                                    });
                                }
                            }
                            PumpStage::Submitting(_) => {
                                tracing::debug!(session_id = %session_id, "Edit ignored while submitting");
                            }
                        },
                        Some(FlowEvent::Submit) => {
                            stage = match stage {
                                PumpStage::Ready(session) => {
                                    let submitting = session.begin_submission();
                                    let submitter = self.submitter.clone();
                                    let draft = submitting.state.draft.clone();
                                    tasks.spawn(async move {
                                        TaskOutput::Submitted(submitter.submit(&draft).await)
                                    });
                                    PumpStage::Submitting(submitting)
                                }
                                PumpStage::Submitting(session) => {
                                    tracing::debug!(
                                        session_id = %session_id,
                                        "Submit ignored, submission already in flight"
                                    );
                                    PumpStage::Submitting(session)
                                }
                            };
                        }
                        None => {
                            tracing::debug!(session_id = %session_id, "Event sender dropped, stopping flow");
                            break Ok(());
                        }
                    }
                }

                Some(joined) = tasks.join_next() => {
                    match joined {
                        Ok(TaskOutput::Cities(list)) => {
                            let uf = list.uf.clone();
                            let fetched = match &list.result {
                                Ok(names) => Some(names.clone()),
                                Err(_) => None,
                            };
                            let resolution = match &mut stage {
                                PumpStage::Ready(session) => session.resolve_cities(list),
                                PumpStage::Submitting(session) => session.resolve_cities(list),
                            };
                            match (resolution, fetched) {
                                (CityResolution::Replaced, Some(cities)) => {
                                    stats.city_lists_applied += 1;
                                    let update = FlowUpdate::CitiesReplaced { uf, cities };
                                    if updates.send(update).await.is_err() {
                                        tracing::debug!(session_id = %session_id, "Update receiver dropped, stopping flow");
                                        break Ok(());
                                    }
                                }
                                (CityResolution::Superseded, _) => {
                                    stats.city_lists_discarded += 1;
                                }
                                _ => {}
                            }
                        }
                        Ok(TaskOutput::Submitted(result)) => {
                            stage = match stage {
                                PumpStage::Submitting(session) => match session.complete(result) {
                                    SubmissionOutcome::Registered(_) => {
                                        if updates.send(FlowUpdate::Registered).await.is_err() {
                                            tracing::debug!(
                                                session_id = %session_id,
                                                "Update receiver dropped after registration"
                                            );
                                        }
                                        break Ok(());
                                    }
                                    SubmissionOutcome::Rejected { session, message } => {
                                        stats.submissions_failed += 1;
                                        let update = FlowUpdate::SubmissionFailed { message };
                                        if updates.send(update).await.is_err() {
                                            break Ok(());
                                        }
                                        PumpStage::Ready(session)
                                    }
                                    SubmissionOutcome::Failed { session, error } => {
                                        stats.submissions_failed += 1;
                                        let update = FlowUpdate::SubmissionFailed {
                                            message: error.user_message(),
                                        };
                                        if updates.send(update).await.is_err() {
                                            break Ok(());
                                        }
                                        PumpStage::Ready(session)
                                    }
                                },
                                PumpStage::Ready(session) => {
                                    // Submission results only come from submission tasks.
                                    tracing::error!(
                                        session_id = %session_id,
                                        "Unexpected submission result outside Submitting"
                                    );
                                    PumpStage::Ready(session)
                                }
                            };
                        }
                        Err(join_error) => {
                            tracing::error!(
                                session_id = %session_id,
                                error = %join_error,
                                "Flow task panicked"
                            );
                        }
                    }
                }
            }
        };

        tracing::info!(
            session_id = %session_id,
            city_lists_applied = stats.city_lists_applied,
            city_lists_discarded = stats.city_lists_discarded,
            submissions_failed = stats.submissions_failed,
            "Flow finished"
        );
        outcome
    }
}
