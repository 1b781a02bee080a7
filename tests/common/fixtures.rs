//! Test fixture creation for the catalog and user databases
//!
//! Fixtures are seeded through the same store APIs the server uses, so the
//! ids in `constants` follow AUTOINCREMENT insertion order.

use super::constants::*;
use acervo_server::catalog_store::{
    ArtistPayload, CatalogStore, GenrePayload, Patch, SongPayload, SqliteCatalogStore,
};
use acervo_server::user::{SqliteUserStore, UserManager, UserRole};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Creates a temporary catalog with 2 genres, 2 artists and 3 songs.
/// Returns (temp_dir, catalog_db_path).
pub fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let catalog_db_path = dir.path().join("catalog.db");

    let store = SqliteCatalogStore::new(&catalog_db_path, 1)?;

    let samba = store.create_genre(GenrePayload {
        name: Patch::Set(Some(GENRE_SAMBA_NAME.to_string())),
    })?;
    let pagode = store.create_genre(GenrePayload {
        name: Patch::Set(Some(GENRE_PAGODE_NAME.to_string())),
    })?;

    let beth = store.create_artist(ArtistPayload {
        name: Patch::Set(Some(ARTIST_BETH_NAME.to_string())),
        photo_url: Patch::Set(Some(ARTIST_BETH_PHOTO_URL.to_string())),
        ..Default::default()
    })?;
    let zeca = store.create_artist(ArtistPayload {
        name: Patch::Set(Some(ARTIST_ZECA_NAME.to_string())),
        ..Default::default()
    })?;

    store.create_song(SongPayload {
        title: Patch::Set(Some(SONG_FESTEJAR_TITLE.to_string())),
        genre_id: Patch::Set(Some(samba.id)),
        artist_ids: Patch::Set(Some(vec![beth.id])),
        lyrics: Patch::Set(Some(SONG_FESTEJAR_LYRICS.to_string())),
        ..Default::default()
    })?;
    store.create_song(SongPayload {
        title: Patch::Set(Some(SONG_DESALINHO_TITLE.to_string())),
        genre_id: Patch::Set(Some(pagode.id)),
        artist_ids: Patch::Set(Some(vec![zeca.id])),
        ..Default::default()
    })?;
    store.create_song(SongPayload {
        title: Patch::Set(Some(SONG_VERDADE_TITLE.to_string())),
        genre_id: Patch::Set(Some(pagode.id)),
        artist_ids: Patch::Set(Some(vec![zeca.id])),
        ..Default::default()
    })?;

    Ok((dir, catalog_db_path))
}

/// Creates a temporary user database with the two test users.
/// Returns (temp_dir, user_db_path).
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("users.db");

    {
        let store = SqliteUserStore::new(&db_path)?;
        let manager = UserManager::new(Arc::new(store));

        let user_id =
            create_user_with_password(&manager, TEST_USER, TEST_PASS, UserRole::Regular)?;
        eprintln!("Created test user {} with id {}", TEST_USER, user_id);

        let admin_id =
            create_user_with_password(&manager, ADMIN_USER, ADMIN_PASS, UserRole::Admin)?;
        eprintln!("Created admin user {} with id {}", ADMIN_USER, admin_id);
    }

    Ok((dir, db_path))
}

/// Creates a user with the given password and role
pub fn create_user_with_password(
    manager: &UserManager,
    username: &str,
    password: &str,
    role: UserRole,
) -> Result<i64> {
    let user_id = manager.add_user(username, role)?;
    manager.create_password_credentials(user_id, password)?;
    Ok(user_id)
}
