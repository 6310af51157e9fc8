//! In-progress registration state.
//!
//! The draft is the single mutable aggregate of the flow: contact fields,
//! the selected state/city pair, the map coordinate, the chosen item ids
//! and an optional photo. It only ever changes by applying a [`DraftEvent`],
//! each application producing the next draft value.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Wire value meaning "nothing selected" in the state and city dropdowns.
pub const NO_SELECTION: &str = "0";

/// A geographic coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A dropdown selection: either the placeholder row or a chosen value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection {
    /// The placeholder row, serialized as `"0"` on the wire.
    #[default]
    Unselected,
    /// A concrete choice (a UF code or a city name).
    Chosen(String),
}

impl Selection {
    /// Build a selection from a raw dropdown value, folding the sentinel.
    pub fn from_value(value: impl Into<String>) -> Self {
        let value = value.into();
        if value == NO_SELECTION {
            Selection::Unselected
        } else {
            Selection::Chosen(value)
        }
    }

    pub fn is_chosen(&self) -> bool {
        matches!(self, Selection::Chosen(_))
    }

    /// The chosen value, if any.
    pub fn as_chosen(&self) -> Option<&str> {
        match self {
            Selection::Chosen(value) => Some(value),
            Selection::Unselected => None,
        }
    }

    /// The wire value: the choice itself, or the sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            Selection::Chosen(value) => value,
            Selection::Unselected => NO_SELECTION,
        }
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An image attached to the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The in-progress registration record.
///
/// Starts empty, accumulates user input through [`Draft::apply`], and is
/// read exactly once by the submission builder. No validation happens here;
/// values are held as entered and the backend validates on submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub name: String,
    pub email: String,
    pub whatsapp: String,
    /// Selected UF code. Choosing a new one always resets `city`.
    pub uf: Selection,
    /// Selected city. Only meaningful while `uf` is chosen.
    pub city: Selection,
    /// Map position. Stays at the origin until geolocation or a map click
    /// provides one.
    pub position: Coordinate,
    /// Selected item ids, kept ordered so the submission join is
    /// deterministic.
    pub items: BTreeSet<i64>,
    pub photo: Option<Photo>,
}

/// A single user input applied to the draft.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftEvent {
    Name(String),
    Email(String),
    Whatsapp(String),
    /// Dropdown selection of a UF code; raw value, sentinel included.
    SelectUf(String),
    /// Dropdown selection of a city name; raw value, sentinel included.
    SelectCity(String),
    /// Map click or geolocation result.
    Position(Coordinate),
    /// Select the id if absent, deselect it if present.
    ToggleItem(i64),
    /// Replace the attached image.
    AttachPhoto(Photo),
}

impl Draft {
    /// Apply one event, producing the next draft value.
    ///
    /// Selecting a UF resets the city to unselected whatever it held before,
    /// so the pair never points across states.
    pub fn apply(self, event: DraftEvent) -> Draft {
        let mut draft = self;
        match event {
            DraftEvent::Name(name) => draft.name = name,
            DraftEvent::Email(email) => draft.email = email,
            DraftEvent::Whatsapp(whatsapp) => draft.whatsapp = whatsapp,
            DraftEvent::SelectUf(value) => {
                draft.uf = Selection::from_value(value);
                draft.city = Selection::Unselected;
            }
            DraftEvent::SelectCity(value) => draft.city = Selection::from_value(value),
            DraftEvent::Position(position) => draft.position = position,
            DraftEvent::ToggleItem(id) => {
                if !draft.items.remove(&id) {
                    draft.items.insert(id);
                }
            }
            DraftEvent::AttachPhoto(photo) => draft.photo = Some(photo),
        }
        draft
    }

    /// Comma-joined selected item ids in ascending order; empty when nothing
    /// is selected.
    pub fn items_joined(&self) -> String {
        self.items
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo() -> Photo {
        Photo {
            file_name: "store.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_text_events_overwrite_fields() {
        let draft = Draft::default()
            .apply(DraftEvent::Name("Mercado Recicla".to_string()))
            .apply(DraftEvent::Email("contato@recicla.com".to_string()))
            .apply(DraftEvent::Whatsapp("11999990000".to_string()));

        assert_eq!(draft.name, "Mercado Recicla");
        assert_eq!(draft.email, "contato@recicla.com");
        assert_eq!(draft.whatsapp, "11999990000");
    }

    #[test]
    fn test_toggle_twice_restores_the_set() {
        let draft = Draft::default()
            .apply(DraftEvent::ToggleItem(3))
            .apply(DraftEvent::ToggleItem(3));

        assert!(draft.items.is_empty());
    }

    #[test]
    fn test_items_join_is_ascending_regardless_of_toggle_order() {
        let draft = Draft::default()
            .apply(DraftEvent::ToggleItem(5))
            .apply(DraftEvent::ToggleItem(1))
            .apply(DraftEvent::ToggleItem(2));

        assert_eq!(draft.items_joined(), "1,2,5");
    }

    #[test]
    fn test_empty_items_join_to_empty_string() {
        assert_eq!(Draft::default().items_joined(), "");
    }

    #[test]
    fn test_selecting_uf_resets_city() {
        let draft = Draft::default()
            .apply(DraftEvent::SelectUf("SP".to_string()))
            .apply(DraftEvent::SelectCity("Santos".to_string()))
            .apply(DraftEvent::SelectUf("RJ".to_string()));

        assert_eq!(draft.uf, Selection::Chosen("RJ".to_string()));
        assert_eq!(draft.city, Selection::Unselected);
    }

    #[test]
    fn test_sentinel_uf_clears_both_selections() {
        let draft = Draft::default()
            .apply(DraftEvent::SelectUf("SP".to_string()))
            .apply(DraftEvent::SelectCity("Santos".to_string()))
            .apply(DraftEvent::SelectUf(NO_SELECTION.to_string()));

        assert_eq!(draft.uf, Selection::Unselected);
        assert_eq!(draft.city, Selection::Unselected);
        assert_eq!(draft.uf.as_str(), "0");
    }

    #[test]
    fn test_sentinel_city_maps_to_unselected() {
        let draft = Draft::default()
            .apply(DraftEvent::SelectUf("SP".to_string()))
            .apply(DraftEvent::SelectCity("Santos".to_string()))
            .apply(DraftEvent::SelectCity(NO_SELECTION.to_string()));

        assert_eq!(draft.city, Selection::Unselected);
    }

    #[test]
    fn test_attach_photo_replaces_previous() {
        let draft = Draft::default()
            .apply(DraftEvent::AttachPhoto(photo()))
            .apply(DraftEvent::AttachPhoto(Photo {
                file_name: "new.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![9],
            }));

        assert_eq!(draft.photo.unwrap().file_name, "new.png");
    }

    #[test]
    fn test_position_event_overwrites_coordinate() {
        let draft = Draft::default().apply(DraftEvent::Position(Coordinate::new(-23.55, -46.63)));
        assert_eq!(draft.position, Coordinate::new(-23.55, -46.63));
        assert_eq!(Draft::default().position, Coordinate::default());
    }
}
