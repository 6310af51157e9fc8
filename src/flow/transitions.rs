//! Stage transitions for registration sessions.
//!
//! Sessions follow this lifecycle:
//!
//! ```text
//! Initializing ──ready()──> Ready ──begin_submission()──> Submitting
//!                             ^                               │
//!                             │        complete(Err)          │
//!                             └───────────────────────────────┤
//!                                                             │ complete(Ok)
//!                                                             v
//!                                                         Succeeded
//! ```
//!
//! Transitions are pure: all IO (lookups, the post itself) happens in the
//! orchestrator, which feeds results back in. That keeps every rule here
//! testable without a network.

use chrono::Utc;

use super::types::{
    CityFetch, CityList, CityResolution, Initializing, Ready, Session, SessionData, SessionId,
    Submitting, SubmissionOutcome, Succeeded,
};
use crate::catalog::Item;
use crate::draft::{Coordinate, Draft, DraftEvent};
use crate::error::{ColetaError, Result};

/// Apply a delivered city list against the current selection.
///
/// The tag check comes first: a result whose UF is no longer selected is
/// discarded whole, success or failure alike.
fn deliver_city_list(
    data: &SessionData,
    draft: &Draft,
    cities: &mut Vec<String>,
    list: CityList,
) -> CityResolution {
    if draft.uf.as_chosen() != Some(list.uf.as_str()) {
        tracing::debug!(
            session_id = %data.id,
            stale_uf = %list.uf,
            current_uf = %draft.uf,
            "Discarding superseded city list"
        );
        return CityResolution::Superseded;
    }

    match list.result {
        Ok(names) => {
            tracing::debug!(
                session_id = %data.id,
                uf = %list.uf,
                count = names.len(),
                "City list replaced"
            );
            *cities = names;
            CityResolution::Replaced
        }
        Err(error) => {
            tracing::warn!(
                session_id = %data.id,
                uf = %list.uf,
                error = %error,
                "City lookup failed, keeping previous list"
            );
            CityResolution::Unavailable
        }
    }
}

impl Session<Initializing> {
    /// Open a fresh session.
    pub fn start() -> Self {
        Session {
            data: SessionData {
                id: SessionId::new(),
            },
            state: Initializing {
                started_at: Utc::now(),
            },
        }
    }

    /// Enter Ready with whatever initialization produced.
    ///
    /// Callers pass defaults for the pieces that failed to load; reaching
    /// Ready is unconditional.
    pub fn ready(
        self,
        position: Coordinate,
        catalog: Vec<Item>,
        states: Vec<String>,
    ) -> Session<Ready> {
        let draft = Draft::default().apply(DraftEvent::Position(position));
        Session {
            data: self.data,
            state: Ready {
                draft,
                catalog,
                states,
                cities: Vec::new(),
            },
        }
    }
}

impl Session<Ready> {
    /// Apply one edit.
    ///
    /// Selecting a state returns the city lookup to run for it, tagged with
    /// the code. Selecting the placeholder clears the visible list and runs
    /// nothing; every other edit is local.
    pub fn apply(&mut self, event: DraftEvent) -> Option<CityFetch> {
        let selects_uf = matches!(event, DraftEvent::SelectUf(_));
        self.state.draft = std::mem::take(&mut self.state.draft).apply(event);

        if !selects_uf {
            return None;
        }

        match self.state.draft.uf.as_chosen() {
            Some(uf) => Some(CityFetch { uf: uf.to_string() }),
            None => {
                // Placeholder picked: the list's owner is gone.
                self.state.cities.clear();
                None
            }
        }
    }

    /// Deliver a resolved city lookup.
    pub fn resolve_cities(&mut self, list: CityList) -> CityResolution {
        deliver_city_list(&self.data, &self.state.draft, &mut self.state.cities, list)
    }

    /// Move the draft onto the wire.
    ///
    /// Consuming the session here is what makes a second post impossible
    /// while the first is undecided.
    pub fn begin_submission(self) -> Session<Submitting> {
        tracing::debug!(session_id = %self.data.id, uf = %self.state.draft.uf, "Submission started");
        Session {
            data: self.data,
            state: Submitting {
                draft: self.state.draft,
                catalog: self.state.catalog,
                states: self.state.states,
                cities: self.state.cities,
                started_at: Utc::now(),
            },
        }
    }
}

impl Session<Submitting> {
    /// Deliver a city lookup that resolved while the post was in flight.
    ///
    /// The selection cannot change during submission, so a matching tag is
    /// still current and applies as usual.
    pub fn resolve_cities(&mut self, list: CityList) -> CityResolution {
        deliver_city_list(&self.data, &self.state.draft, &mut self.state.cities, list)
    }

    /// Map the post's result onto the next stage.
    pub fn complete(self, result: Result<()>) -> SubmissionOutcome {
        let elapsed_ms = (Utc::now() - self.state.started_at).num_milliseconds();
        match result {
            Ok(()) => {
                tracing::info!(
                    session_id = %self.data.id,
                    elapsed_ms = elapsed_ms,
                    "Registration accepted"
                );
                SubmissionOutcome::Registered(Session {
                    data: self.data,
                    state: Succeeded {
                        registered_at: Utc::now(),
                    },
                })
            }
            Err(ColetaError::SubmissionRejected(message)) => {
                tracing::warn!(
                    session_id = %self.data.id,
                    elapsed_ms = elapsed_ms,
                    message = %message,
                    "Registration rejected, form reopened"
                );
                SubmissionOutcome::Rejected {
                    session: self.reopen(),
                    message,
                }
            }
            Err(error) => {
                tracing::warn!(
                    session_id = %self.data.id,
                    elapsed_ms = elapsed_ms,
                    error = %error,
                    "Submission failed, form reopened"
                );
                SubmissionOutcome::Failed {
                    session: self.reopen(),
                    error,
                }
            }
        }
    }

    /// Back to Ready with the draft and lists untouched.
    fn reopen(self) -> Session<Ready> {
        Session {
            data: self.data,
            state: Ready {
                draft: self.state.draft,
                catalog: self.state.catalog,
                states: self.state.states,
                cities: self.state.cities,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{NO_SELECTION, Selection};

    fn ready_session() -> Session<Ready> {
        Session::start().ready(Coordinate::new(-23.55, -46.63), Vec::new(), vec![
            "SP".to_string(),
            "RJ".to_string(),
        ])
    }

    fn city_list(uf: &str, names: &[&str]) -> CityList {
        CityList {
            uf: uf.to_string(),
            result: Ok(names.iter().map(|name| name.to_string()).collect()),
        }
    }

    #[test]
    fn test_start_seeds_position_and_empty_lists() {
        let session = ready_session();
        assert_eq!(session.state.draft.position, Coordinate::new(-23.55, -46.63));
        assert_eq!(session.state.draft.uf, Selection::Unselected);
        assert!(session.state.cities.is_empty());
        assert_eq!(session.state.states.len(), 2);
    }

    #[test]
    fn test_selecting_a_state_requests_its_cities() {
        let mut session = ready_session();
        let fetch = session.apply(DraftEvent::SelectUf("SP".to_string()));
        assert_eq!(fetch, Some(CityFetch { uf: "SP".to_string() }));
        assert_eq!(session.state.draft.city, Selection::Unselected);
    }

    #[test]
    fn test_selecting_placeholder_clears_cities_and_fetches_nothing() {
        let mut session = ready_session();
        session.apply(DraftEvent::SelectUf("SP".to_string()));
        session.resolve_cities(city_list("SP", &["Santos"]));
        assert_eq!(session.state.cities, vec!["Santos"]);

        let fetch = session.apply(DraftEvent::SelectUf(NO_SELECTION.to_string()));
        assert_eq!(fetch, None);
        assert!(session.state.cities.is_empty());
        assert_eq!(session.state.draft.uf, Selection::Unselected);
    }

    #[test]
    fn test_non_state_edits_fetch_nothing() {
        let mut session = ready_session();
        assert_eq!(session.apply(DraftEvent::Name("Loja".to_string())), None);
        assert_eq!(session.apply(DraftEvent::ToggleItem(1)), None);
        assert_eq!(
            session.apply(DraftEvent::SelectCity("Santos".to_string())),
            None
        );
    }

    #[test]
    fn test_matching_city_list_replaces_wholesale() {
        let mut session = ready_session();
        session.apply(DraftEvent::SelectUf("SP".to_string()));
        session.resolve_cities(city_list("SP", &["Santos"]));

        session.apply(DraftEvent::SelectUf("SP".to_string()));
        let resolution = session.resolve_cities(city_list("SP", &["Campinas", "Santos"]));
        assert_eq!(resolution, CityResolution::Replaced);
        assert_eq!(session.state.cities, vec!["Campinas", "Santos"]);
    }

    #[test]
    fn test_stale_city_list_is_discarded_when_late_result_arrives_last() {
        let mut session = ready_session();
        session.apply(DraftEvent::SelectUf("SP".to_string()));
        session.apply(DraftEvent::SelectUf("RJ".to_string()));

        // RJ resolves first, then SP's slow lookup lands.
        assert_eq!(
            session.resolve_cities(city_list("RJ", &["Niterói"])),
            CityResolution::Replaced
        );
        assert_eq!(
            session.resolve_cities(city_list("SP", &["Santos"])),
            CityResolution::Superseded
        );
        assert_eq!(session.state.cities, vec!["Niterói"]);
    }

    #[test]
    fn test_stale_city_list_is_discarded_when_it_arrives_first() {
        let mut session = ready_session();
        session.apply(DraftEvent::SelectUf("SP".to_string()));
        session.apply(DraftEvent::SelectUf("RJ".to_string()));

        assert_eq!(
            session.resolve_cities(city_list("SP", &["Santos"])),
            CityResolution::Superseded
        );
        assert!(session.state.cities.is_empty());
        assert_eq!(
            session.resolve_cities(city_list("RJ", &["Niterói"])),
            CityResolution::Replaced
        );
        assert_eq!(session.state.cities, vec!["Niterói"]);
    }

    #[test]
    fn test_failed_current_lookup_keeps_previous_list() {
        let mut session = ready_session();
        session.apply(DraftEvent::SelectUf("SP".to_string()));
        session.resolve_cities(city_list("SP", &["Santos"]));

        session.apply(DraftEvent::SelectUf("SP".to_string()));
        let resolution = session.resolve_cities(CityList {
            uf: "SP".to_string(),
            result: Err(ColetaError::Other(anyhow::anyhow!("timeout"))),
        });
        assert_eq!(resolution, CityResolution::Unavailable);
        assert_eq!(session.state.cities, vec!["Santos"]);
    }

    #[test]
    fn test_failed_stale_lookup_is_superseded_not_unavailable() {
        let mut session = ready_session();
        session.apply(DraftEvent::SelectUf("SP".to_string()));
        session.apply(DraftEvent::SelectUf("RJ".to_string()));

        let resolution = session.resolve_cities(CityList {
            uf: "SP".to_string(),
            result: Err(ColetaError::Other(anyhow::anyhow!("timeout"))),
        });
        assert_eq!(resolution, CityResolution::Superseded);
    }

    #[test]
    fn test_city_lists_apply_during_submission() {
        let mut session = ready_session();
        session.apply(DraftEvent::SelectUf("SP".to_string()));

        let mut submitting = session.begin_submission();
        let resolution = submitting.resolve_cities(city_list("SP", &["Santos"]));
        assert_eq!(resolution, CityResolution::Replaced);
        assert_eq!(submitting.state.cities, vec!["Santos"]);
    }

    #[test]
    fn test_accepted_submission_reaches_succeeded() {
        let session = ready_session();
        let id = session.data.id;
        match session.begin_submission().complete(Ok(())) {
            SubmissionOutcome::Registered(done) => assert_eq!(done.data.id, id),
            other => panic!("expected Registered, got {other:?}"),
        }
    }

    #[test]
    fn test_rejected_submission_reopens_with_draft_intact() {
        let mut session = ready_session();
        session.apply(DraftEvent::Name("Mercado Recicla".to_string()));
        session.apply(DraftEvent::SelectUf("SP".to_string()));
        session.resolve_cities(city_list("SP", &["Santos"]));
        session.apply(DraftEvent::SelectCity("Santos".to_string()));

        let outcome = session
            .begin_submission()
            .complete(Err(ColetaError::SubmissionRejected(
                "email inválido".to_string(),
            )));

        match outcome {
            SubmissionOutcome::Rejected { session, message } => {
                assert_eq!(message, "email inválido");
                assert_eq!(session.state.draft.name, "Mercado Recicla");
                assert_eq!(session.state.draft.city, Selection::Chosen("Santos".to_string()));
                assert_eq!(session.state.cities, vec!["Santos"]);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_transport_failure_reopens_as_failed() {
        let mut session = ready_session();
        session.apply(DraftEvent::ToggleItem(2));

        let outcome = session
            .begin_submission()
            .complete(Err(ColetaError::Other(anyhow::anyhow!("connection refused"))));

        match outcome {
            SubmissionOutcome::Failed { session, error } => {
                assert!(session.state.draft.items.contains(&2));
                assert_eq!(error.user_message(), "connection refused");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
