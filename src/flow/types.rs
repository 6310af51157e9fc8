//! Session types for the registration flow.
//!
//! A session is a typestate record: the generic parameter is the current
//! stage, and transitions consume the session and return it in the next
//! stage. Posting twice or editing a finished session does not compile.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::Item;
use crate::draft::{Coordinate, Draft, DraftEvent};
use crate::error::ColetaError;

/// Unique identifier for a registration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        SessionId(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 8 characters keep log lines readable.
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Stage names for logging and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Ready,
    Submitting,
    Succeeded,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::Ready => "ready",
            SessionStatus::Submitting => "submitting",
            SessionStatus::Succeeded => "succeeded",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Marker trait for valid session stages.
pub trait Stage: Send + Sync {
    fn status(&self) -> SessionStatus;
}

/// Immutable session metadata, carried through every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub id: SessionId,
}

/// One registration session in stage `S`.
#[derive(Debug, Clone)]
pub struct Session<S: Stage> {
    pub data: SessionData,
    pub state: S,
}

/// Catalog, UF list and geolocation are being loaded.
#[derive(Debug, Clone)]
pub struct Initializing {
    pub started_at: DateTime<Utc>,
}

impl Stage for Initializing {
    fn status(&self) -> SessionStatus {
        SessionStatus::Initializing
    }
}

/// The form is usable: edits apply synchronously and city lists load
/// reactively as states are picked.
#[derive(Debug, Clone)]
pub struct Ready {
    pub draft: Draft,
    pub catalog: Vec<Item>,
    pub states: Vec<String>,
    /// City names of the currently selected UF; empty while none is chosen.
    pub cities: Vec<String>,
}

impl Stage for Ready {
    fn status(&self) -> SessionStatus {
        SessionStatus::Ready
    }
}

/// The draft is on the wire. Edits are refused until the outcome is known.
/// The lists stay around so a late city result can still land and a
/// rejection can restore the form untouched.
#[derive(Debug, Clone)]
pub struct Submitting {
    pub draft: Draft,
    pub catalog: Vec<Item>,
    pub states: Vec<String>,
    pub cities: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl Stage for Submitting {
    fn status(&self) -> SessionStatus {
        SessionStatus::Submitting
    }
}

/// Terminal stage: the point was registered.
#[derive(Debug, Clone)]
pub struct Succeeded {
    pub registered_at: DateTime<Utc>,
}

impl Stage for Succeeded {
    fn status(&self) -> SessionStatus {
        SessionStatus::Succeeded
    }
}

/// A city-list lookup to run for one state selection.
///
/// The UF code doubles as the request's tag: the result only applies while
/// that code is still the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityFetch {
    pub uf: String,
}

/// A resolved city-list lookup, still carrying its originating tag.
#[derive(Debug)]
pub struct CityList {
    pub uf: String,
    pub result: crate::error::Result<Vec<String>>,
}

/// What became of a delivered city list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityResolution {
    /// The tag matched the current selection and the visible list was
    /// replaced wholesale.
    Replaced,
    /// The selection moved on while the lookup was in flight; the result
    /// was discarded on arrival.
    Superseded,
    /// The lookup failed. The previous list is kept; re-selecting the state
    /// retries.
    Unavailable,
}

/// Result of completing a submission.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// The backend accepted the registration; the session is finished.
    Registered(Session<Succeeded>),
    /// The backend reported a business error. The session returns to Ready
    /// with the draft intact so the user can correct and resubmit.
    Rejected {
        session: Session<Ready>,
        message: String,
    },
    /// The post never produced a server verdict. The session returns to
    /// Ready for a user-initiated retry.
    Failed {
        session: Session<Ready>,
        error: ColetaError,
    },
}

/// User actions driving the event pump.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// A form edit.
    Edit(DraftEvent),
    /// The explicit submit action.
    Submit,
}

/// Notifications emitted by the event pump for the embedding UI.
#[derive(Debug, Clone)]
pub enum FlowUpdate {
    /// Initialization finished and the form is usable.
    Loaded {
        catalog: Vec<Item>,
        states: Vec<String>,
        position: Coordinate,
    },
    /// A city lookup resolved for the currently selected state.
    CitiesReplaced { uf: String, cities: Vec<String> },
    /// The submission did not go through; the form is editable again with
    /// everything it held.
    SubmissionFailed { message: String },
    /// The point was registered and the flow is over.
    Registered,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_displays_short_form() {
        let id = SessionId::new();
        assert_eq!(id.to_string().len(), 8);
        assert!(id.0.to_string().starts_with(&id.to_string()));
    }

    #[test]
    fn test_status_names_are_stable() {
        assert_eq!(SessionStatus::Initializing.as_str(), "initializing");
        assert_eq!(SessionStatus::Ready.as_str(), "ready");
        assert_eq!(SessionStatus::Submitting.as_str(), "submitting");
        assert_eq!(SessionStatus::Succeeded.as_str(), "succeeded");
    }
}
