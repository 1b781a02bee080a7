//! CatalogStore trait definition and the error type its operations return.
//!
//! The trait keeps the server decoupled from the SQLite implementation, which
//! is also what lets tests drive handlers against small fixture databases.

use thiserror::Error;

use super::models::{
    ArtistPayload, CatalogCounts, CollectionQuery, GenrePayload, ResolvedArtist, ResolvedGenre,
    ResolvedSong, SongPayload, SongQuery,
};
use super::validation::{single_field_error, FieldErrors};

/// Error taxonomy for catalog operations.
///
/// `Validation` carries the field map that becomes the 400 body. `NotFound`
/// maps to 404 on CRUD routes; the action routes collapse it to a bare 400.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("entity not found")]
    NotFound,
    #[error("validation failed on fields [{}]", field_list(.0))]
    Validation(FieldErrors),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

fn field_list(errors: &FieldErrors) -> String {
    errors.keys().cloned().collect::<Vec<_>>().join(", ")
}

impl CatalogError {
    pub fn single_field(field: &str, message: impl Into<String>) -> Self {
        CatalogError::Validation(single_field_error(field, message))
    }
}

impl From<FieldErrors> for CatalogError {
    fn from(errors: FieldErrors) -> Self {
        CatalogError::Validation(errors)
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::Storage(e.into())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Storage backend for the music catalog.
///
/// Every mutation validates the merged state and commits in one transaction.
/// Getters return `None` for missing ids; mutations on missing ids return
/// `CatalogError::NotFound`.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Artists
    // =========================================================================

    fn create_artist(&self, payload: ArtistPayload) -> CatalogResult<ResolvedArtist>;

    /// `require_all` distinguishes full updates (PUT) from partial ones
    /// (PATCH): a full update insists the required fields are present.
    fn update_artist(
        &self,
        id: i64,
        payload: ArtistPayload,
        require_all: bool,
    ) -> CatalogResult<ResolvedArtist>;

    /// Returns false when no artist had that id.
    fn delete_artist(&self, id: i64) -> CatalogResult<bool>;

    fn get_resolved_artist(&self, id: i64) -> CatalogResult<Option<ResolvedArtist>>;

    fn list_artists(&self, query: &CollectionQuery) -> CatalogResult<Vec<ResolvedArtist>>;

    /// Clear the artist's stored photo reference.
    fn remove_artist_photo(&self, id: i64) -> CatalogResult<ResolvedArtist>;

    // =========================================================================
    // Genres
    // =========================================================================

    fn create_genre(&self, payload: GenrePayload) -> CatalogResult<ResolvedGenre>;

    fn update_genre(
        &self,
        id: i64,
        payload: GenrePayload,
        require_all: bool,
    ) -> CatalogResult<ResolvedGenre>;

    /// Deletes the genre's songs with it. Returns false when no genre had
    /// that id.
    fn delete_genre(&self, id: i64) -> CatalogResult<bool>;

    fn get_resolved_genre(&self, id: i64) -> CatalogResult<Option<ResolvedGenre>>;

    fn list_genres(&self, query: &CollectionQuery) -> CatalogResult<Vec<ResolvedGenre>>;

    // =========================================================================
    // Songs
    // =========================================================================

    fn create_song(&self, payload: SongPayload) -> CatalogResult<ResolvedSong>;

    fn update_song(
        &self,
        id: i64,
        payload: SongPayload,
        require_all: bool,
    ) -> CatalogResult<ResolvedSong>;

    fn delete_song(&self, id: i64) -> CatalogResult<bool>;

    fn get_resolved_song(&self, id: i64) -> CatalogResult<Option<ResolvedSong>>;

    fn list_songs(&self, query: &SongQuery) -> CatalogResult<Vec<ResolvedSong>>;

    fn like_song(&self, id: i64) -> CatalogResult<ResolvedSong>;

    fn dislike_song(&self, id: i64) -> CatalogResult<ResolvedSong>;

    // =========================================================================
    // Search
    // =========================================================================

    /// Songs whose title or lyrics contain `term`, case-insensitively.
    fn search_songs(&self, term: &str) -> CatalogResult<Vec<ResolvedSong>>;

    /// Artists whose name contains `term`, case-insensitively.
    fn search_artists(&self, term: &str) -> CatalogResult<Vec<ResolvedArtist>>;

    /// Genres whose name contains `term`, case-insensitively.
    fn search_genres(&self, term: &str) -> CatalogResult<Vec<ResolvedGenre>>;

    // =========================================================================
    // Counts (statistics endpoint and metrics)
    // =========================================================================

    fn counts(&self) -> CatalogResult<CatalogCounts>;
}
