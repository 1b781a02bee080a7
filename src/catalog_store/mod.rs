mod models;
mod schema;
mod store;
mod trait_def;
pub mod validation;

pub use models::{
    Artist, ArtistPayload, CatalogCounts, CollectionQuery, Genre, GenrePayload, Patch,
    ResolvedArtist, ResolvedGenre, ResolvedSong, Song, SongEntry, SongPayload, SongQuery,
};
pub use store::SqliteCatalogStore;
pub use trait_def::{CatalogError, CatalogResult, CatalogStore};
pub use validation::FieldErrors;
