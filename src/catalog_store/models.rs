//! Catalog models for the SQLite-backed music store.
//!
//! Row types carry internal English field names; the wire types rename every
//! field to the Portuguese API vocabulary (`titulo`, `genero`, `gostar`, ...)
//! the frontend was built against.

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Partial-update plumbing
// =============================================================================

/// Tri-state field wrapper for write payloads.
///
/// With `#[serde(default)]` on the field, a key that is missing from the JSON
/// body deserializes to `Absent`, while a present key (including an explicit
/// `null` when `T` is an `Option`) deserializes to `Set`. Updates use this to
/// tell "leave unchanged" apart from "overwrite" and "set to null".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn set_value(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Absent => None,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

// =============================================================================
// Row Entities
// =============================================================================

/// Artist row as stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub photo: Option<String>,
    pub photo_url: Option<String>,
}

/// Genre row as stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Song row as stored. Artist links live in the junction table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub genre_id: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub lyrics: Option<String>,
    pub video_url: Option<String>,
}

// =============================================================================
// Wire Types (API Responses)
// =============================================================================

/// Flat song form embedded in artist and genre responses: relations stay ids.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SongEntry {
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "genero")]
    pub genre: i64,
    #[serde(rename = "gostar")]
    pub likes: i64,
    #[serde(rename = "naoGostar")]
    pub dislikes: i64,
    #[serde(rename = "letra")]
    pub lyrics: Option<String>,
    #[serde(rename = "artistas")]
    pub artists: Vec<i64>,
    #[serde(rename = "url_do_video")]
    pub video_url: Option<String>,
}

/// Artist with its songs in flat form.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ResolvedArtist {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "foto")]
    pub photo: Option<String>,
    #[serde(rename = "url_da_foto")]
    pub photo_url: Option<String>,
    #[serde(rename = "musicas")]
    pub songs: Vec<SongEntry>,
}

/// Genre with its songs in flat form.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ResolvedGenre {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "musicas")]
    pub songs: Vec<SongEntry>,
}

/// Song with genre and artists fully embedded. The nesting stops one level
/// down: the embedded genre and artists carry flat song entries only.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ResolvedSong {
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "gostar")]
    pub likes: i64,
    #[serde(rename = "naoGostar")]
    pub dislikes: i64,
    #[serde(rename = "letra")]
    pub lyrics: Option<String>,
    #[serde(rename = "url_do_video")]
    pub video_url: Option<String>,
    #[serde(rename = "genero")]
    pub genre: ResolvedGenre,
    #[serde(rename = "artistas")]
    pub artists: Vec<ResolvedArtist>,
}

/// Collection sizes for the statistics endpoint and the catalog gauges.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CatalogCounts {
    #[serde(rename = "musicas")]
    pub songs: usize,
    #[serde(rename = "artistas")]
    pub artists: usize,
    #[serde(rename = "generos")]
    pub genres: usize,
}

// =============================================================================
// Write Payloads
// =============================================================================

/// Artist create/update body.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ArtistPayload {
    #[serde(default, rename = "nome")]
    pub name: Patch<Option<String>>,
    #[serde(default, rename = "foto")]
    pub photo: Patch<Option<String>>,
    #[serde(default, rename = "url_da_foto")]
    pub photo_url: Patch<Option<String>>,
}

/// Genre create/update body.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct GenrePayload {
    #[serde(default, rename = "nome")]
    pub name: Patch<Option<String>>,
}

/// Song create/update body. `genero_id` and `artistas_ids` are the write-only
/// relation inputs; the response embeds the resolved entities instead.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct SongPayload {
    #[serde(default, rename = "titulo")]
    pub title: Patch<Option<String>>,
    #[serde(default, rename = "genero_id")]
    pub genre_id: Patch<Option<i64>>,
    #[serde(default, rename = "gostar")]
    pub likes: Patch<Option<i64>>,
    #[serde(default, rename = "naoGostar")]
    pub dislikes: Patch<Option<i64>>,
    #[serde(default, rename = "letra")]
    pub lyrics: Patch<Option<String>>,
    #[serde(default, rename = "url_do_video")]
    pub video_url: Patch<Option<String>>,
    #[serde(default, rename = "artistas_ids")]
    pub artist_ids: Patch<Option<Vec<i64>>>,
}

// =============================================================================
// List Query Parameters
// =============================================================================

/// Query parameters accepted by the artist and genre list endpoints.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CollectionQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// Query parameters accepted by the song list endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SongQuery {
    pub search: Option<String>,
    #[serde(rename = "genero")]
    pub genre: Option<i64>,
    #[serde(rename = "artistas")]
    pub artist: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_field_deserializes_to_absent() {
        let payload: ArtistPayload = serde_json::from_str(r#"{"nome": "Cartola"}"#).unwrap();
        assert_eq!(payload.name, Patch::Set(Some("Cartola".to_string())));
        assert_eq!(payload.photo, Patch::Absent);
        assert_eq!(payload.photo_url, Patch::Absent);
    }

    #[test]
    fn explicit_null_deserializes_to_set_none() {
        let payload: ArtistPayload =
            serde_json::from_str(r#"{"nome": "Cartola", "url_da_foto": null}"#).unwrap();
        assert_eq!(payload.photo_url, Patch::Set(None));
    }

    #[test]
    fn empty_artist_list_is_distinct_from_absent() {
        let with_empty: SongPayload = serde_json::from_str(r#"{"artistas_ids": []}"#).unwrap();
        assert_eq!(with_empty.artist_ids, Patch::Set(Some(vec![])));

        let without: SongPayload = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(without.artist_ids, Patch::Absent);
    }

    #[test]
    fn song_payload_uses_wire_names() {
        let payload: SongPayload = serde_json::from_str(
            r#"{
                "titulo": "Irene",
                "genero_id": 2,
                "gostar": 3,
                "naoGostar": 1,
                "letra": "Irene ri",
                "url_do_video": "http://example.com/v",
                "artistas_ids": [1, 4]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.title, Patch::Set(Some("Irene".to_string())));
        assert_eq!(payload.genre_id, Patch::Set(Some(2)));
        assert_eq!(payload.likes, Patch::Set(Some(3)));
        assert_eq!(payload.dislikes, Patch::Set(Some(1)));
        assert_eq!(payload.artist_ids, Patch::Set(Some(vec![1, 4])));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let payload: GenrePayload =
            serde_json::from_str(r#"{"nome": "Samba", "id": 7, "bogus": true}"#).unwrap();
        assert_eq!(payload.name, Patch::Set(Some("Samba".to_string())));
    }

    #[test]
    fn song_entry_serializes_with_wire_names() {
        let entry = SongEntry {
            id: 1,
            title: "Irene".to_string(),
            genre: 2,
            likes: 0,
            dislikes: 0,
            lyrics: None,
            artists: vec![3],
            video_url: None,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["titulo"], "Irene");
        assert_eq!(value["genero"], 2);
        assert_eq!(value["naoGostar"], 0);
        assert_eq!(value["artistas"], serde_json::json!([3]));
        assert!(value.get("title").is_none());
    }
}
