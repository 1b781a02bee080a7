//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all catalog-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for the open read endpoints and for testing authentication
    /// flows. For the protected write endpoints, use `authenticated()`.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client with a logged-in session for the regular test user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        let client = Self::new(base_url);

        let response = client.login(TEST_USER, TEST_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    /// Creates a client with a logged-in session for the admin user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated_admin(base_url: String) -> Self {
        let client = Self::new(base_url);

        let response = client.login(ADMIN_USER, ADMIN_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Admin authentication failed: {:?}",
            response.text().await
        );

        client
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /auth/login/
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.login_raw(json!({ "username": username, "password": password }))
            .await
    }

    /// POST /auth/login/ with an arbitrary body
    ///
    /// Useful for testing malformed login requests.
    pub async fn login_raw(&self, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/auth/login/", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Login request failed")
    }

    /// POST /auth/logout/
    pub async fn logout(&self) -> Response {
        self.client
            .post(format!("{}/auth/logout/", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// POST /auth/token/
    pub async fn obtain_token(&self, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/auth/token/", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Obtain token request failed")
    }

    // ========================================================================
    // Artist Endpoints
    // ========================================================================

    /// GET /artistas/
    pub async fn list_artists(&self) -> Response {
        self.client
            .get(format!("{}/artistas/", self.base_url))
            .send()
            .await
            .expect("List artists request failed")
    }

    /// GET /artistas/ with query parameters
    pub async fn list_artists_with_query(&self, query: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/artistas/", self.base_url))
            .query(query)
            .send()
            .await
            .expect("List artists request failed")
    }

    /// POST /artistas/
    pub async fn create_artist(&self, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/artistas/", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Create artist request failed")
    }

    /// POST /artistas/ authenticated by the token header instead of the
    /// session cookie
    pub async fn create_artist_with_token(
        &self,
        token: &str,
        body: serde_json::Value,
    ) -> Response {
        self.client
            .post(format!("{}/artistas/", self.base_url))
            .header("Authorization", token)
            .json(&body)
            .send()
            .await
            .expect("Create artist request failed")
    }

    /// GET /artistas/{id}/
    pub async fn get_artist(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/artistas/{}/", self.base_url, id))
            .send()
            .await
            .expect("Get artist request failed")
    }

    /// PUT /artistas/{id}/
    pub async fn put_artist(&self, id: i64, body: serde_json::Value) -> Response {
        self.client
            .put(format!("{}/artistas/{}/", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Put artist request failed")
    }

    /// PATCH /artistas/{id}/
    pub async fn patch_artist(&self, id: i64, body: serde_json::Value) -> Response {
        self.client
            .patch(format!("{}/artistas/{}/", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Patch artist request failed")
    }

    /// DELETE /artistas/{id}/
    pub async fn delete_artist(&self, id: i64) -> Response {
        self.client
            .delete(format!("{}/artistas/{}/", self.base_url, id))
            .send()
            .await
            .expect("Delete artist request failed")
    }

    /// POST /artistas/{id}/remover_foto/
    pub async fn remove_artist_photo(&self, id: i64) -> Response {
        self.client
            .post(format!("{}/artistas/{}/remover_foto/", self.base_url, id))
            .send()
            .await
            .expect("Remove artist photo request failed")
    }

    // ========================================================================
    // Genre Endpoints
    // ========================================================================

    /// GET /generos/
    pub async fn list_genres(&self) -> Response {
        self.client
            .get(format!("{}/generos/", self.base_url))
            .send()
            .await
            .expect("List genres request failed")
    }

    /// GET /generos/ with query parameters
    pub async fn list_genres_with_query(&self, query: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/generos/", self.base_url))
            .query(query)
            .send()
            .await
            .expect("List genres request failed")
    }

    /// POST /generos/
    pub async fn create_genre(&self, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/generos/", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Create genre request failed")
    }

    /// GET /generos/{id}/
    pub async fn get_genre(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/generos/{}/", self.base_url, id))
            .send()
            .await
            .expect("Get genre request failed")
    }

    /// PUT /generos/{id}/
    pub async fn put_genre(&self, id: i64, body: serde_json::Value) -> Response {
        self.client
            .put(format!("{}/generos/{}/", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Put genre request failed")
    }

    /// PATCH /generos/{id}/
    pub async fn patch_genre(&self, id: i64, body: serde_json::Value) -> Response {
        self.client
            .patch(format!("{}/generos/{}/", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Patch genre request failed")
    }

    /// DELETE /generos/{id}/
    pub async fn delete_genre(&self, id: i64) -> Response {
        self.client
            .delete(format!("{}/generos/{}/", self.base_url, id))
            .send()
            .await
            .expect("Delete genre request failed")
    }

    // ========================================================================
    // Song Endpoints
    // ========================================================================

    /// GET /musicas/
    pub async fn list_songs(&self) -> Response {
        self.client
            .get(format!("{}/musicas/", self.base_url))
            .send()
            .await
            .expect("List songs request failed")
    }

    /// GET /musicas/ with query parameters
    pub async fn list_songs_with_query(&self, query: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/musicas/", self.base_url))
            .query(query)
            .send()
            .await
            .expect("List songs request failed")
    }

    /// POST /musicas/
    pub async fn create_song(&self, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/musicas/", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Create song request failed")
    }

    /// GET /musicas/{id}/
    pub async fn get_song(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/musicas/{}/", self.base_url, id))
            .send()
            .await
            .expect("Get song request failed")
    }

    /// PUT /musicas/{id}/
    pub async fn put_song(&self, id: i64, body: serde_json::Value) -> Response {
        self.client
            .put(format!("{}/musicas/{}/", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Put song request failed")
    }

    /// PATCH /musicas/{id}/
    pub async fn patch_song(&self, id: i64, body: serde_json::Value) -> Response {
        self.client
            .patch(format!("{}/musicas/{}/", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Patch song request failed")
    }

    /// DELETE /musicas/{id}/
    pub async fn delete_song(&self, id: i64) -> Response {
        self.client
            .delete(format!("{}/musicas/{}/", self.base_url, id))
            .send()
            .await
            .expect("Delete song request failed")
    }

    /// POST /musicas/{id}/gostar/
    pub async fn like_song(&self, id: i64) -> Response {
        self.client
            .post(format!("{}/musicas/{}/gostar/", self.base_url, id))
            .send()
            .await
            .expect("Like song request failed")
    }

    /// POST /musicas/{id}/nao_gostar/
    pub async fn dislike_song(&self, id: i64) -> Response {
        self.client
            .post(format!("{}/musicas/{}/nao_gostar/", self.base_url, id))
            .send()
            .await
            .expect("Dislike song request failed")
    }

    // ========================================================================
    // Search and Statistics Endpoints
    // ========================================================================

    /// GET /pesquisa/ with an optional search term
    pub async fn search(&self, term: Option<&str>) -> Response {
        let mut request = self.client.get(format!("{}/pesquisa/", self.base_url));
        if let Some(term) = term {
            request = request.query(&[("search", term)]);
        }
        request.send().await.expect("Search request failed")
    }

    /// GET /estatisticas/
    pub async fn get_statistics(&self) -> Response {
        self.client
            .get(format!("{}/estatisticas/", self.base_url))
            .send()
            .await
            .expect("Get statistics request failed")
    }

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Get home request failed")
    }
}
