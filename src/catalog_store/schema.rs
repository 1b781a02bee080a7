//! SQLite schema for the music catalog database.
//!
//! Three entity tables plus one junction table. Primary keys are integer
//! rowids, which is what the API exposes as entity ids. Foreign keys encode
//! the deletion contract: removing a genre cascades to its songs, removing a
//! song or an artist only clears the junction rows between them.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, OnDeleteAction, SqlType, Table, VersionedSchema};

const GENRE_FK: ForeignKey = ForeignKey {
    table: "genres",
    column: "id",
    on_delete: OnDeleteAction::Cascade,
};

const SONG_FK: ForeignKey = ForeignKey {
    table: "songs",
    column: "id",
    on_delete: OnDeleteAction::Cascade,
};

const ARTIST_FK: ForeignKey = ForeignKey {
    table: "artists",
    column: "id",
    on_delete: OnDeleteAction::Cascade,
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", SqlType::Text, non_null = true),
        sqlite_column!("photo", SqlType::Text),
        sqlite_column!("photo_url", SqlType::Text),
    ],
    indices: &[("index_artists_name", "name")],
    unique_constraints: &[],
};

const GENRES_TABLE: Table = Table {
    name: "genres",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["name"]],
};

const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", SqlType::Text, non_null = true),
        sqlite_column!(
            "genre_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(GENRE_FK)
        ),
        sqlite_column!(
            "likes",
            SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "dislikes",
            SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("lyrics", SqlType::Text),
        sqlite_column!("video_url", SqlType::Text),
    ],
    indices: &[("index_songs_genre", "genre_id")],
    unique_constraints: &[],
};

const SONG_ARTISTS_TABLE: Table = Table {
    name: "song_artists",
    columns: &[
        sqlite_column!(
            "song_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(SONG_FK)
        ),
        sqlite_column!(
            "artist_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(ARTIST_FK)
        ),
    ],
    indices: &[
        ("index_song_artists_song", "song_id"),
        ("index_song_artists_artist", "artist_id"),
    ],
    unique_constraints: &[&["song_id", "artist_id"]],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[ARTISTS_TABLE, GENRES_TABLE, SONGS_TABLE, SONG_ARTISTS_TABLE],
    migration: None,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};

    fn fresh_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        CATALOG_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn
    }

    #[test]
    fn schema_creates_and_validates() {
        let conn = fresh_db();
        CATALOG_VERSIONED_SCHEMAS[0].validate(&conn).unwrap();
    }

    #[test]
    fn genre_names_are_unique() {
        let conn = fresh_db();
        conn.execute("INSERT INTO genres (name) VALUES ('Samba')", [])
            .unwrap();
        let duplicate = conn.execute("INSERT INTO genres (name) VALUES ('Samba')", []);
        assert!(duplicate.is_err());
        // Uniqueness is case-sensitive.
        conn.execute("INSERT INTO genres (name) VALUES ('samba')", [])
            .unwrap();
    }

    #[test]
    fn deleting_genre_cascades_to_songs() {
        let conn = fresh_db();
        conn.execute("INSERT INTO genres (name) VALUES ('Samba')", [])
            .unwrap();
        let genre_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO songs (title, genre_id) VALUES ('Irene', ?1)",
            params![genre_id],
        )
        .unwrap();

        conn.execute("DELETE FROM genres WHERE id = ?1", params![genre_id])
            .unwrap();

        let songs: i64 = conn
            .query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))
            .unwrap();
        assert_eq!(songs, 0);
    }

    #[test]
    fn deleting_artist_detaches_but_keeps_songs() {
        let conn = fresh_db();
        conn.execute("INSERT INTO genres (name) VALUES ('Samba')", [])
            .unwrap();
        let genre_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO songs (title, genre_id) VALUES ('Irene', ?1)",
            params![genre_id],
        )
        .unwrap();
        let song_id = conn.last_insert_rowid();
        conn.execute("INSERT INTO artists (name) VALUES ('Beth Carvalho')", [])
            .unwrap();
        let artist_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO song_artists (song_id, artist_id) VALUES (?1, ?2)",
            params![song_id, artist_id],
        )
        .unwrap();

        conn.execute("DELETE FROM artists WHERE id = ?1", params![artist_id])
            .unwrap();

        let links: i64 = conn
            .query_row("SELECT COUNT(*) FROM song_artists", [], |r| r.get(0))
            .unwrap();
        assert_eq!(links, 0);
        let songs: i64 = conn
            .query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))
            .unwrap();
        assert_eq!(songs, 1);
    }

    #[test]
    fn song_artist_links_do_not_duplicate() {
        let conn = fresh_db();
        conn.execute("INSERT INTO genres (name) VALUES ('Samba')", [])
            .unwrap();
        let genre_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO songs (title, genre_id) VALUES ('Irene', ?1)",
            params![genre_id],
        )
        .unwrap();
        let song_id = conn.last_insert_rowid();
        conn.execute("INSERT INTO artists (name) VALUES ('Beth Carvalho')", [])
            .unwrap();
        let artist_id = conn.last_insert_rowid();

        conn.execute(
            "INSERT INTO song_artists (song_id, artist_id) VALUES (?1, ?2)",
            params![song_id, artist_id],
        )
        .unwrap();
        let duplicate = conn.execute(
            "INSERT INTO song_artists (song_id, artist_id) VALUES (?1, ?2)",
            params![song_id, artist_id],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn counters_default_to_zero() {
        let conn = fresh_db();
        conn.execute("INSERT INTO genres (name) VALUES ('Samba')", [])
            .unwrap();
        let genre_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO songs (title, genre_id) VALUES ('Irene', ?1)",
            params![genre_id],
        )
        .unwrap();

        let (likes, dislikes): (i64, i64) = conn
            .query_row("SELECT likes, dislikes FROM songs", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!((likes, dislikes), (0, 0));
    }
}
