//! Client-side registration flow for recycling collection points.
//!
//! The crate drives the whole "register a collection point" journey against
//! two services: the point backend (item catalog and multipart point
//! creation) and the public localities API (UF and city lookups). A
//! typestate [`Session`] accumulates the form draft while city lists load
//! reactively for the selected state, with stale results discarded on
//! arrival. Submission posts the draft exactly once and surfaces server
//! rejections as user-visible messages.
//!
//! HTTP access sits behind the [`HttpClient`] trait, so everything here can
//! run against [`MockHttpClient`] in tests and [`ReqwestHttpClient`] in
//! production.

pub mod catalog;
pub mod draft;
pub mod error;
pub mod flow;
pub mod geo;
pub mod http;
pub mod locate;
pub mod submit;

// Re-export commonly used types
pub use catalog::{Item, ItemCatalogClient};
pub use draft::{Coordinate, Draft, DraftEvent, NO_SELECTION, Photo, Selection};
pub use error::{ColetaError, Result};
pub use flow::{
    CityFetch, CityList, CityResolution, FlowConfig, FlowEvent, FlowUpdate, PointRegistrationFlow,
    Session, SessionId, SessionStatus, SubmissionOutcome,
};
pub use geo::GeoLookupClient;
pub use http::{
    FilePart, HttpClient, HttpResponse, MockCall, MockHttpClient, MultipartForm, ReqwestHttpClient,
};
pub use locate::{FixedGeolocator, Geolocator, UnavailableGeolocator};
pub use submit::SubmissionBuilder;
