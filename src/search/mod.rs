//! Cross-collection lookup backing the public search endpoint.
//!
//! The heavy lifting happens in the catalog store's LIKE queries; this layer
//! only fans one term out to the three collections and shapes the response.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog_store::{
    CatalogResult, CatalogStore, ResolvedArtist, ResolvedGenre, ResolvedSong,
};

/// One list per collection. All three stay null when no term was given, so
/// clients can tell "no search" apart from "searched and found nothing".
#[derive(Clone, Debug, Default, Serialize)]
pub struct SearchResults {
    #[serde(rename = "musicas")]
    pub songs: Option<Vec<ResolvedSong>>,
    #[serde(rename = "artistas")]
    pub artists: Option<Vec<ResolvedArtist>>,
    #[serde(rename = "generos")]
    pub genres: Option<Vec<ResolvedGenre>>,
}

#[derive(Clone)]
pub struct CatalogSearch {
    catalog: Arc<dyn CatalogStore>,
}

impl CatalogSearch {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Runs the term against songs, artists and genres. An empty string is
    /// still a term and matches every row.
    pub fn search(&self, term: Option<&str>) -> CatalogResult<SearchResults> {
        let term = match term {
            Some(term) => term,
            None => return Ok(SearchResults::default()),
        };
        Ok(SearchResults {
            songs: Some(self.catalog.search_songs(term)?),
            artists: Some(self.catalog.search_artists(term)?),
            genres: Some(self.catalog.search_genres(term)?),
        })
    }
}
