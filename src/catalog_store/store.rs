//! SQLite-backed catalog store implementation.
//!
//! A single write connection serializes all mutations, each of which runs
//! inside one IMMEDIATE transaction so a rejected payload never leaves
//! partial rows behind. Reads go through a small round-robin pool of
//! read-only connections, which WAL mode keeps unblocked by writers.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};
use tracing::info;

use super::models::{
    Artist, ArtistPayload, CatalogCounts, CollectionQuery, Genre, GenrePayload, Patch,
    ResolvedArtist, ResolvedGenre, ResolvedSong, Song, SongEntry, SongPayload, SongQuery,
};
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::{CatalogError, CatalogResult, CatalogStore};
use super::validation::{
    self, add_field_error, invalid_reference_message, FieldErrors, UNIQUE_MESSAGE,
};
use crate::sqlite_persistence::BASE_DB_VERSION;

/// Store backed by a SQLite database file.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    if table_count == 0 {
        info!("Creating catalog database schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let user_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if (user_version as usize) < BASE_DB_VERSION {
        bail!("Catalog database has no recognizable schema version, refusing to open it");
    }
    let mut current_version = user_version as usize - BASE_DB_VERSION;
    if current_version > latest_version {
        bail!(
            "Catalog database is at schema version {} but this build only knows versions up to {}",
            current_version,
            latest_version
        );
    }
    if current_version == latest_version {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for schema in CATALOG_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
        if let Some(migration) = schema.migration {
            info!(
                "Migrating catalog database from version {} to {}",
                current_version, schema.version
            );
            migration(&tx)?;
            current_version = schema.version;
        }
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
    tx.commit()?;
    Ok(())
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

fn name_order_clause(ordering: Option<&str>) -> &'static str {
    // Unknown ordering values fall back to insertion order.
    match ordering {
        Some("nome") => " ORDER BY name",
        Some("-nome") => " ORDER BY name DESC",
        _ => " ORDER BY id",
    }
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database at {:?}", db_path))?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        migrate_if_needed(&mut write_conn)?;
        CATALOG_VERSIONED_SCHEMAS[CATALOG_VERSIONED_SCHEMAS.len() - 1].validate(&write_conn)?;

        let counts = Self::read_counts(&write_conn)?;
        info!(
            "Opened catalog database with {} songs, {} artists, {} genres",
            counts.songs, counts.artists, counts.genres
        );

        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.pragma_update(None, "journal_mode", "WAL")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteCatalogStore {
            read_pool,
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn with_write_txn<T>(
        &self,
        op: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("BEGIN IMMEDIATE", [])?;
        match op(&conn) {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    // ============================================================================================
    // Row loading
    // ============================================================================================

    fn parse_artist_row(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
        Ok(Artist {
            id: row.get(0)?,
            name: row.get(1)?,
            photo: row.get(2)?,
            photo_url: row.get(3)?,
        })
    }

    fn parse_genre_row(row: &rusqlite::Row) -> rusqlite::Result<Genre> {
        Ok(Genre {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }

    fn parse_song_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
        Ok(Song {
            id: row.get(0)?,
            title: row.get(1)?,
            genre_id: row.get(2)?,
            likes: row.get(3)?,
            dislikes: row.get(4)?,
            lyrics: row.get(5)?,
            video_url: row.get(6)?,
        })
    }

    fn load_artist(conn: &Connection, id: i64) -> CatalogResult<Option<Artist>> {
        let mut stmt =
            conn.prepare_cached("SELECT id, name, photo, photo_url FROM artists WHERE id = ?1")?;
        match stmt.query_row(params![id], Self::parse_artist_row) {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn load_genre(conn: &Connection, id: i64) -> CatalogResult<Option<Genre>> {
        let mut stmt = conn.prepare_cached("SELECT id, name FROM genres WHERE id = ?1")?;
        match stmt.query_row(params![id], Self::parse_genre_row) {
            Ok(genre) => Ok(Some(genre)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn load_song(conn: &Connection, id: i64) -> CatalogResult<Option<Song>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, genre_id, likes, dislikes, lyrics, video_url FROM songs WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], Self::parse_song_row) {
            Ok(song) => Ok(Some(song)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn artist_exists(conn: &Connection, id: i64) -> CatalogResult<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM artists WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn genre_exists(conn: &Connection, id: i64) -> CatalogResult<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM genres WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn song_exists(conn: &Connection, id: i64) -> CatalogResult<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM songs WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn genre_name_taken(conn: &Connection, name: &str, exclude_id: i64) -> CatalogResult<bool> {
        let taken: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM genres WHERE name = ?1 AND id != ?2)",
            params![name, exclude_id],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    // ============================================================================================
    // Resolution
    // ============================================================================================

    fn song_artist_ids(conn: &Connection, song_id: i64) -> CatalogResult<Vec<i64>> {
        let mut stmt = conn
            .prepare_cached("SELECT artist_id FROM song_artists WHERE song_id = ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![song_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn song_entry(conn: &Connection, song: &Song) -> CatalogResult<SongEntry> {
        Ok(SongEntry {
            id: song.id,
            title: song.title.clone(),
            genre: song.genre_id,
            likes: song.likes,
            dislikes: song.dislikes,
            lyrics: song.lyrics.clone(),
            artists: Self::song_artist_ids(conn, song.id)?,
            video_url: song.video_url.clone(),
        })
    }

    fn genre_song_entries(conn: &Connection, genre_id: i64) -> CatalogResult<Vec<SongEntry>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, genre_id, likes, dislikes, lyrics, video_url \
             FROM songs WHERE genre_id = ?1 ORDER BY id",
        )?;
        let songs = stmt
            .query_map(params![genre_id], Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        songs
            .iter()
            .map(|song| Self::song_entry(conn, song))
            .collect()
    }

    fn artist_song_entries(conn: &Connection, artist_id: i64) -> CatalogResult<Vec<SongEntry>> {
        let mut stmt = conn.prepare_cached(
            "SELECT s.id, s.title, s.genre_id, s.likes, s.dislikes, s.lyrics, s.video_url \
             FROM songs s \
             INNER JOIN song_artists sa ON sa.song_id = s.id \
             WHERE sa.artist_id = ?1 ORDER BY s.id",
        )?;
        let songs = stmt
            .query_map(params![artist_id], Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        songs
            .iter()
            .map(|song| Self::song_entry(conn, song))
            .collect()
    }

    fn resolve_artist(conn: &Connection, artist: Artist) -> CatalogResult<ResolvedArtist> {
        let songs = Self::artist_song_entries(conn, artist.id)?;
        Ok(ResolvedArtist {
            id: artist.id,
            name: artist.name,
            photo: artist.photo,
            photo_url: artist.photo_url,
            songs,
        })
    }

    fn resolve_genre(conn: &Connection, genre: Genre) -> CatalogResult<ResolvedGenre> {
        let songs = Self::genre_song_entries(conn, genre.id)?;
        Ok(ResolvedGenre {
            id: genre.id,
            name: genre.name,
            songs,
        })
    }

    fn resolve_song(conn: &Connection, song: Song) -> CatalogResult<ResolvedSong> {
        let genre = Self::load_genre(conn, song.genre_id)?
            .with_context(|| format!("Song {} references missing genre {}", song.id, song.genre_id))?;
        let genre = Self::resolve_genre(conn, genre)?;
        let mut artists = Vec::new();
        for artist_id in Self::song_artist_ids(conn, song.id)? {
            if let Some(artist) = Self::load_artist(conn, artist_id)? {
                artists.push(Self::resolve_artist(conn, artist)?);
            }
        }
        Ok(ResolvedSong {
            id: song.id,
            title: song.title,
            likes: song.likes,
            dislikes: song.dislikes,
            lyrics: song.lyrics,
            video_url: song.video_url,
            genre,
            artists,
        })
    }

    // ============================================================================================
    // Write helpers
    // ============================================================================================

    fn check_song_references(conn: &Connection, payload: &SongPayload) -> CatalogResult<()> {
        let mut errors = FieldErrors::new();
        if let Patch::Set(Some(genre_id)) = &payload.genre_id {
            if !Self::genre_exists(conn, *genre_id)? {
                add_field_error(&mut errors, "genero_id", invalid_reference_message(*genre_id));
            }
        }
        if let Patch::Set(Some(artist_ids)) = &payload.artist_ids {
            // Only the first unresolvable id is reported.
            for artist_id in artist_ids {
                if !Self::artist_exists(conn, *artist_id)? {
                    add_field_error(
                        &mut errors,
                        "artistas_ids",
                        invalid_reference_message(*artist_id),
                    );
                    break;
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }

    fn replace_song_artists(conn: &Connection, song_id: i64, artist_ids: &[i64]) -> CatalogResult<()> {
        conn.execute("DELETE FROM song_artists WHERE song_id = ?1", params![song_id])?;
        for artist_id in artist_ids {
            conn.execute(
                "INSERT OR IGNORE INTO song_artists (song_id, artist_id) VALUES (?1, ?2)",
                params![song_id, artist_id],
            )?;
        }
        Ok(())
    }

    fn bump_song_counter(&self, id: i64, column: &'static str) -> CatalogResult<ResolvedSong> {
        self.with_write_txn(|conn| {
            if !Self::song_exists(conn, id)? {
                return Err(CatalogError::NotFound);
            }
            conn.execute(
                &format!("UPDATE songs SET {0} = {0} + 1 WHERE id = ?1", column),
                params![id],
            )?;
            let updated = Self::load_song(conn, id)?.context("Song row vanished during update")?;
            Self::resolve_song(conn, updated)
        })
    }

    fn read_counts(conn: &Connection) -> Result<CatalogCounts> {
        let songs: i64 = conn.query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        let artists: i64 = conn.query_row("SELECT COUNT(*) FROM artists", [], |row| row.get(0))?;
        let genres: i64 = conn.query_row("SELECT COUNT(*) FROM genres", [], |row| row.get(0))?;
        Ok(CatalogCounts {
            songs: songs as usize,
            artists: artists as usize,
            genres: genres as usize,
        })
    }
}

impl CatalogStore for SqliteCatalogStore {
    // ============================================================================================
    // Artists
    // ============================================================================================

    fn create_artist(&self, payload: ArtistPayload) -> CatalogResult<ResolvedArtist> {
        self.with_write_txn(|conn| {
            let base = Artist {
                id: 0,
                name: String::new(),
                photo: None,
                photo_url: None,
            };
            let artist = validation::merge_artist(base, &payload, true)?;
            conn.execute(
                "INSERT INTO artists (name, photo, photo_url) VALUES (?1, ?2, ?3)",
                params![artist.name, artist.photo, artist.photo_url],
            )?;
            let created = Self::load_artist(conn, conn.last_insert_rowid())?
                .context("Artist row vanished after insert")?;
            Self::resolve_artist(conn, created)
        })
    }

    fn update_artist(
        &self,
        id: i64,
        payload: ArtistPayload,
        require_all: bool,
    ) -> CatalogResult<ResolvedArtist> {
        self.with_write_txn(|conn| {
            let existing = Self::load_artist(conn, id)?.ok_or(CatalogError::NotFound)?;
            let merged = validation::merge_artist(existing, &payload, require_all)?;
            conn.execute(
                "UPDATE artists SET name = ?1, photo = ?2, photo_url = ?3 WHERE id = ?4",
                params![merged.name, merged.photo, merged.photo_url, id],
            )?;
            Self::resolve_artist(conn, merged)
        })
    }

    fn delete_artist(&self, id: i64) -> CatalogResult<bool> {
        self.with_write_txn(|conn| {
            if !Self::artist_exists(conn, id)? {
                return Ok(false);
            }
            conn.execute("DELETE FROM song_artists WHERE artist_id = ?1", params![id])?;
            conn.execute("DELETE FROM artists WHERE id = ?1", params![id])?;
            Ok(true)
        })
    }

    fn get_resolved_artist(&self, id: i64) -> CatalogResult<Option<ResolvedArtist>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        match Self::load_artist(&conn, id)? {
            Some(artist) => Ok(Some(Self::resolve_artist(&conn, artist)?)),
            None => Ok(None),
        }
    }

    fn list_artists(&self, query: &CollectionQuery) -> CatalogResult<Vec<ResolvedArtist>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();

        let mut sql = String::from("SELECT id, name, photo, photo_url FROM artists");
        let mut sql_params: Vec<SqlValue> = Vec::new();
        if let Some(term) = &query.search {
            sql.push_str(" WHERE name LIKE ?1 ESCAPE '\\'");
            sql_params.push(SqlValue::from(contains_pattern(term)));
        }
        sql.push_str(name_order_clause(query.ordering.as_deref()));

        let mut stmt = conn.prepare(&sql)?;
        let artists = stmt
            .query_map(params_from_iter(sql_params), Self::parse_artist_row)?
            .collect::<Result<Vec<_>, _>>()?;
        artists
            .into_iter()
            .map(|artist| Self::resolve_artist(&conn, artist))
            .collect()
    }

    fn remove_artist_photo(&self, id: i64) -> CatalogResult<ResolvedArtist> {
        self.with_write_txn(|conn| {
            let artist = Self::load_artist(conn, id)?.ok_or(CatalogError::NotFound)?;
            conn.execute("UPDATE artists SET photo = NULL WHERE id = ?1", params![id])?;
            Self::resolve_artist(conn, Artist { photo: None, ..artist })
        })
    }

    // ============================================================================================
    // Genres
    // ============================================================================================

    fn create_genre(&self, payload: GenrePayload) -> CatalogResult<ResolvedGenre> {
        self.with_write_txn(|conn| {
            let base = Genre {
                id: 0,
                name: String::new(),
            };
            let genre = validation::merge_genre(base, &payload, true)?;
            if Self::genre_name_taken(conn, &genre.name, 0)? {
                return Err(CatalogError::single_field("nome", UNIQUE_MESSAGE));
            }
            conn.execute("INSERT INTO genres (name) VALUES (?1)", params![genre.name])?;
            let created = Self::load_genre(conn, conn.last_insert_rowid())?
                .context("Genre row vanished after insert")?;
            Self::resolve_genre(conn, created)
        })
    }

    fn update_genre(
        &self,
        id: i64,
        payload: GenrePayload,
        require_all: bool,
    ) -> CatalogResult<ResolvedGenre> {
        self.with_write_txn(|conn| {
            let existing = Self::load_genre(conn, id)?.ok_or(CatalogError::NotFound)?;
            let merged = validation::merge_genre(existing, &payload, require_all)?;
            if Self::genre_name_taken(conn, &merged.name, id)? {
                return Err(CatalogError::single_field("nome", UNIQUE_MESSAGE));
            }
            conn.execute(
                "UPDATE genres SET name = ?1 WHERE id = ?2",
                params![merged.name, id],
            )?;
            Self::resolve_genre(conn, merged)
        })
    }

    fn delete_genre(&self, id: i64) -> CatalogResult<bool> {
        self.with_write_txn(|conn| {
            if !Self::genre_exists(conn, id)? {
                return Ok(false);
            }
            conn.execute(
                "DELETE FROM song_artists WHERE song_id IN (SELECT id FROM songs WHERE genre_id = ?1)",
                params![id],
            )?;
            conn.execute("DELETE FROM songs WHERE genre_id = ?1", params![id])?;
            conn.execute("DELETE FROM genres WHERE id = ?1", params![id])?;
            Ok(true)
        })
    }

    fn get_resolved_genre(&self, id: i64) -> CatalogResult<Option<ResolvedGenre>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        match Self::load_genre(&conn, id)? {
            Some(genre) => Ok(Some(Self::resolve_genre(&conn, genre)?)),
            None => Ok(None),
        }
    }

    fn list_genres(&self, query: &CollectionQuery) -> CatalogResult<Vec<ResolvedGenre>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();

        let mut sql = String::from("SELECT id, name FROM genres");
        let mut sql_params: Vec<SqlValue> = Vec::new();
        if let Some(term) = &query.search {
            sql.push_str(" WHERE name LIKE ?1 ESCAPE '\\'");
            sql_params.push(SqlValue::from(contains_pattern(term)));
        }
        sql.push_str(name_order_clause(query.ordering.as_deref()));

        let mut stmt = conn.prepare(&sql)?;
        let genres = stmt
            .query_map(params_from_iter(sql_params), Self::parse_genre_row)?
            .collect::<Result<Vec<_>, _>>()?;
        genres
            .into_iter()
            .map(|genre| Self::resolve_genre(&conn, genre))
            .collect()
    }

    // ============================================================================================
    // Songs
    // ============================================================================================

    fn create_song(&self, payload: SongPayload) -> CatalogResult<ResolvedSong> {
        self.with_write_txn(|conn| {
            let base = Song {
                id: 0,
                title: String::new(),
                genre_id: 0,
                likes: 0,
                dislikes: 0,
                lyrics: None,
                video_url: None,
            };
            let song = validation::merge_song(base, &payload, true)?;
            Self::check_song_references(conn, &payload)?;

            conn.execute(
                "INSERT INTO songs (title, genre_id, likes, dislikes, lyrics, video_url) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    song.title,
                    song.genre_id,
                    song.likes,
                    song.dislikes,
                    song.lyrics,
                    song.video_url
                ],
            )?;
            let song_id = conn.last_insert_rowid();
            if let Patch::Set(Some(artist_ids)) = &payload.artist_ids {
                Self::replace_song_artists(conn, song_id, artist_ids)?;
            }

            let created =
                Self::load_song(conn, song_id)?.context("Song row vanished after insert")?;
            Self::resolve_song(conn, created)
        })
    }

    fn update_song(
        &self,
        id: i64,
        payload: SongPayload,
        require_all: bool,
    ) -> CatalogResult<ResolvedSong> {
        self.with_write_txn(|conn| {
            let existing = Self::load_song(conn, id)?.ok_or(CatalogError::NotFound)?;
            let merged = validation::merge_song(existing, &payload, require_all)?;
            Self::check_song_references(conn, &payload)?;

            conn.execute(
                "UPDATE songs SET title = ?1, genre_id = ?2, likes = ?3, dislikes = ?4, \
                 lyrics = ?5, video_url = ?6 WHERE id = ?7",
                params![
                    merged.title,
                    merged.genre_id,
                    merged.likes,
                    merged.dislikes,
                    merged.lyrics,
                    merged.video_url,
                    id
                ],
            )?;
            if let Patch::Set(Some(artist_ids)) = &payload.artist_ids {
                Self::replace_song_artists(conn, id, artist_ids)?;
            }

            let updated = Self::load_song(conn, id)?.context("Song row vanished during update")?;
            Self::resolve_song(conn, updated)
        })
    }

    fn delete_song(&self, id: i64) -> CatalogResult<bool> {
        self.with_write_txn(|conn| {
            if !Self::song_exists(conn, id)? {
                return Ok(false);
            }
            conn.execute("DELETE FROM song_artists WHERE song_id = ?1", params![id])?;
            conn.execute("DELETE FROM songs WHERE id = ?1", params![id])?;
            Ok(true)
        })
    }

    fn get_resolved_song(&self, id: i64) -> CatalogResult<Option<ResolvedSong>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        match Self::load_song(&conn, id)? {
            Some(song) => Ok(Some(Self::resolve_song(&conn, song)?)),
            None => Ok(None),
        }
    }

    fn list_songs(&self, query: &SongQuery) -> CatalogResult<Vec<ResolvedSong>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT s.id, s.title, s.genre_id, s.likes, s.dislikes, s.lyrics, s.video_url \
             FROM songs s INNER JOIN genres g ON g.id = s.genre_id",
        );
        let mut clauses: Vec<String> = Vec::new();
        let mut sql_params: Vec<SqlValue> = Vec::new();

        if let Some(genre_id) = query.genre {
            sql_params.push(SqlValue::from(genre_id));
            clauses.push(format!("s.genre_id = ?{}", sql_params.len()));
        }
        if let Some(artist_id) = query.artist {
            sql_params.push(SqlValue::from(artist_id));
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM song_artists sa \
                 WHERE sa.song_id = s.id AND sa.artist_id = ?{})",
                sql_params.len()
            ));
        }
        if let Some(term) = &query.search {
            let pattern = contains_pattern(term);
            let first = sql_params.len() + 1;
            for _ in 0..4 {
                sql_params.push(SqlValue::from(pattern.clone()));
            }
            clauses.push(format!(
                "(s.title LIKE ?{0} ESCAPE '\\' OR s.lyrics LIKE ?{1} ESCAPE '\\' \
                 OR g.name LIKE ?{2} ESCAPE '\\' \
                 OR EXISTS (SELECT 1 FROM song_artists sa \
                 INNER JOIN artists a ON a.id = sa.artist_id \
                 WHERE sa.song_id = s.id AND a.name LIKE ?{3} ESCAPE '\\'))",
                first,
                first + 1,
                first + 2,
                first + 3
            ));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY s.id");

        let mut stmt = conn.prepare(&sql)?;
        let songs = stmt
            .query_map(params_from_iter(sql_params), Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        songs
            .into_iter()
            .map(|song| Self::resolve_song(&conn, song))
            .collect()
    }

    fn like_song(&self, id: i64) -> CatalogResult<ResolvedSong> {
        self.bump_song_counter(id, "likes")
    }

    fn dislike_song(&self, id: i64) -> CatalogResult<ResolvedSong> {
        self.bump_song_counter(id, "dislikes")
    }

    // ============================================================================================
    // Search
    // ============================================================================================

    fn search_songs(&self, term: &str) -> CatalogResult<Vec<ResolvedSong>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, genre_id, likes, dislikes, lyrics, video_url FROM songs \
             WHERE title LIKE ?1 ESCAPE '\\' OR lyrics LIKE ?1 ESCAPE '\\' ORDER BY id",
        )?;
        let songs = stmt
            .query_map(params![contains_pattern(term)], Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        songs
            .into_iter()
            .map(|song| Self::resolve_song(&conn, song))
            .collect()
    }

    fn search_artists(&self, term: &str) -> CatalogResult<Vec<ResolvedArtist>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, photo, photo_url FROM artists \
             WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id",
        )?;
        let artists = stmt
            .query_map(params![contains_pattern(term)], Self::parse_artist_row)?
            .collect::<Result<Vec<_>, _>>()?;
        artists
            .into_iter()
            .map(|artist| Self::resolve_artist(&conn, artist))
            .collect()
    }

    fn search_genres(&self, term: &str) -> CatalogResult<Vec<ResolvedGenre>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name FROM genres WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id",
        )?;
        let genres = stmt
            .query_map(params![contains_pattern(term)], Self::parse_genre_row)?
            .collect::<Result<Vec<_>, _>>()?;
        genres
            .into_iter()
            .map(|genre| Self::resolve_genre(&conn, genre))
            .collect()
    }

    fn counts(&self) -> CatalogResult<CatalogCounts> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        Ok(Self::read_counts(&conn)?)
    }
}
