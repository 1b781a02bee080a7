//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, seeded catalog rows, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user name
pub const TEST_USER: &str = "testuser";

/// Regular test user password
pub const TEST_PASS: &str = "testpass123";

/// Admin test user name
pub const ADMIN_USER: &str = "admin";

/// Admin test user password
pub const ADMIN_PASS: &str = "adminpass123";

// ============================================================================
// Seeded Catalog Ids
// ============================================================================
//
// Every server starts from a freshly created catalog database, so
// AUTOINCREMENT assigns these ids deterministically in insertion order.

/// Genre id for "Samba"
pub const GENRE_SAMBA_ID: i64 = 1;

/// Genre id for "Pagode"
pub const GENRE_PAGODE_ID: i64 = 2;

/// Artist id for "Beth Carvalho"
pub const ARTIST_BETH_ID: i64 = 1;

/// Artist id for "Zeca Pagodinho"
pub const ARTIST_ZECA_ID: i64 = 2;

/// Song id for "Vou Festejar" (Samba, Beth Carvalho)
pub const SONG_FESTEJAR_ID: i64 = 1;

/// Song id for "Coração em Desalinho" (Pagode, Zeca Pagodinho)
pub const SONG_DESALINHO_ID: i64 = 2;

/// Song id for "Verdade" (Pagode, Zeca Pagodinho)
pub const SONG_VERDADE_ID: i64 = 3;

// ============================================================================
// Seeded Catalog Metadata
// ============================================================================

/// Genre 1 name
pub const GENRE_SAMBA_NAME: &str = "Samba";

/// Genre 2 name
pub const GENRE_PAGODE_NAME: &str = "Pagode";

/// Artist 1 name
pub const ARTIST_BETH_NAME: &str = "Beth Carvalho";

/// Artist 2 name
pub const ARTIST_ZECA_NAME: &str = "Zeca Pagodinho";

/// Artist 1 photo URL (plain http, the store rejects https here)
pub const ARTIST_BETH_PHOTO_URL: &str = "http://example.com/fotos/beth.jpg";

/// Song 1 title
pub const SONG_FESTEJAR_TITLE: &str = "Vou Festejar";

/// Song 1 lyrics
pub const SONG_FESTEJAR_LYRICS: &str = "Vou festejar o teu sofrer";

/// Song 2 title
pub const SONG_DESALINHO_TITLE: &str = "Coração em Desalinho";

/// Song 3 title
pub const SONG_VERDADE_TITLE: &str = "Verdade";

// ============================================================================
// Seeded Catalog Counts
// ============================================================================

/// Songs in the seeded catalog
pub const SEEDED_SONG_COUNT: usize = 3;

/// Artists in the seeded catalog
pub const SEEDED_ARTIST_COUNT: usize = 2;

/// Genres in the seeded catalog
pub const SEEDED_GENRE_COUNT: usize = 2;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
