//! Field validation and partial-update merging for catalog writes.
//!
//! The merge functions apply a write payload on top of an entity row and
//! collect rule violations as a field -> messages map, which becomes the 400
//! response body. Messages stay in Portuguese for wire compatibility with the
//! frontend this API serves. Checks that need database access (genre name
//! uniqueness, reference existence) live in the store, inside the same write
//! transaction.

use std::collections::BTreeMap;

use super::models::{Artist, ArtistPayload, Genre, GenrePayload, Patch, Song, SongPayload};

/// Field name to list of messages, serialized as the 400 response body.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const MAX_NAME_LENGTH: usize = 64;
pub const MAX_TITLE_LENGTH: usize = 128;

pub const REQUIRED_MESSAGE: &str = "Este campo é obrigatório.";
pub const NOT_NULL_MESSAGE: &str = "Este campo não pode ser nulo.";
pub const NOT_BLANK_MESSAGE: &str = "Este campo não pode ser em branco.";
pub const UNIQUE_MESSAGE: &str = "Este campo deve ser único.";
pub const NON_NEGATIVE_MESSAGE: &str =
    "Certifique-se de que este valor seja maior ou igual a 0.";
pub const PHOTO_URL_HTTPS_MESSAGE: &str = "A URL da foto não pode usar o protocolo HTTPS";

pub fn max_length_message(max_length: usize) -> String {
    format!(
        "Certifique-se de que este campo não tenha mais de {} caracteres.",
        max_length
    )
}

pub fn invalid_reference_message(id: i64) -> String {
    format!("Pk inválido \"{}\" - objeto não existe.", id)
}

pub fn add_field_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

pub fn single_field_error(field: &str, message: impl Into<String>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    add_field_error(&mut errors, field, message);
    errors
}

fn merge_required_string(
    errors: &mut FieldErrors,
    field: &'static str,
    target: &mut String,
    patch: &Patch<Option<String>>,
    required: bool,
    max_length: usize,
) {
    match patch {
        Patch::Absent => {
            if required {
                add_field_error(errors, field, REQUIRED_MESSAGE);
            }
        }
        Patch::Set(None) => add_field_error(errors, field, NOT_NULL_MESSAGE),
        Patch::Set(Some(value)) => {
            if value.is_empty() {
                add_field_error(errors, field, NOT_BLANK_MESSAGE);
            } else if value.chars().count() > max_length {
                add_field_error(errors, field, max_length_message(max_length));
            } else {
                *target = value.clone();
            }
        }
    }
}

fn merge_nullable_string(target: &mut Option<String>, patch: &Patch<Option<String>>) {
    if let Patch::Set(value) = patch {
        *target = value.clone();
    }
}

fn merge_counter(
    errors: &mut FieldErrors,
    field: &'static str,
    target: &mut i64,
    patch: &Patch<Option<i64>>,
) {
    match patch {
        Patch::Absent => {}
        Patch::Set(None) => add_field_error(errors, field, NOT_NULL_MESSAGE),
        Patch::Set(Some(value)) => {
            if *value < 0 {
                add_field_error(errors, field, NON_NEGATIVE_MESSAGE);
            } else {
                *target = *value;
            }
        }
    }
}

/// Apply an artist payload on top of `artist` and run the field rules plus
/// the HTTPS photo-URL rule on the merged state. `require_all` is create and
/// full-update semantics: the required fields must be present in the payload.
pub fn merge_artist(
    mut artist: Artist,
    payload: &ArtistPayload,
    require_all: bool,
) -> Result<Artist, FieldErrors> {
    let mut errors = FieldErrors::new();
    merge_required_string(
        &mut errors,
        "nome",
        &mut artist.name,
        &payload.name,
        require_all,
        MAX_NAME_LENGTH,
    );
    merge_nullable_string(&mut artist.photo, &payload.photo);
    merge_nullable_string(&mut artist.photo_url, &payload.photo_url);

    // Entity-level rule, checked only once the per-field phase is clean.
    if errors.is_empty() {
        if let Some(url) = &artist.photo_url {
            if url.starts_with("https") {
                add_field_error(&mut errors, "url_da_foto", PHOTO_URL_HTTPS_MESSAGE);
            }
        }
    }

    if errors.is_empty() {
        Ok(artist)
    } else {
        Err(errors)
    }
}

pub fn merge_genre(
    mut genre: Genre,
    payload: &GenrePayload,
    require_all: bool,
) -> Result<Genre, FieldErrors> {
    let mut errors = FieldErrors::new();
    merge_required_string(
        &mut errors,
        "nome",
        &mut genre.name,
        &payload.name,
        require_all,
        MAX_NAME_LENGTH,
    );
    if errors.is_empty() {
        Ok(genre)
    } else {
        Err(errors)
    }
}

/// Apply a song payload on top of `song`. Whether the genre and artist ids
/// actually resolve is the store's job; everything that needs no database
/// access is checked here.
pub fn merge_song(
    mut song: Song,
    payload: &SongPayload,
    require_all: bool,
) -> Result<Song, FieldErrors> {
    let mut errors = FieldErrors::new();
    merge_required_string(
        &mut errors,
        "titulo",
        &mut song.title,
        &payload.title,
        require_all,
        MAX_TITLE_LENGTH,
    );
    match &payload.genre_id {
        Patch::Absent => {
            if require_all {
                add_field_error(&mut errors, "genero_id", REQUIRED_MESSAGE);
            }
        }
        Patch::Set(None) => add_field_error(&mut errors, "genero_id", NOT_NULL_MESSAGE),
        Patch::Set(Some(genre_id)) => song.genre_id = *genre_id,
    }
    merge_counter(&mut errors, "gostar", &mut song.likes, &payload.likes);
    merge_counter(&mut errors, "naoGostar", &mut song.dislikes, &payload.dislikes);
    merge_nullable_string(&mut song.lyrics, &payload.lyrics);
    merge_nullable_string(&mut song.video_url, &payload.video_url);
    if let Patch::Set(None) = &payload.artist_ids {
        add_field_error(&mut errors, "artistas_ids", NOT_NULL_MESSAGE);
    }
    if errors.is_empty() {
        Ok(song)
    } else {
        Err(errors)
    }
}
