use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, warn};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::services::ServeDir;

use crate::catalog_store::validation::{
    add_field_error, FieldErrors, NOT_BLANK_MESSAGE, NOT_NULL_MESSAGE, REQUIRED_MESSAGE,
};
use crate::catalog_store::{
    ArtistPayload, CatalogError, CatalogResult, CatalogStore, CollectionQuery, GenrePayload,
    Patch, SongPayload, SongQuery,
};
use crate::search::CatalogSearch;
use crate::user::UserManager;

use super::http_layers::log_requests;
#[cfg(feature = "slowdown")]
use super::http_layers::slowdown_request;
use super::metrics;
use super::session::{self, Session};
use super::state::{GuardedCatalogStore, ServerState};
use super::ServerConfig;

const INVALID_CREDENTIALS_MESSAGE: &str =
    "Impossível fazer login com as credenciais fornecidas.";

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TokenBody {
    #[serde(default)]
    pub username: Patch<Option<String>>,
    #[serde(default)]
    pub password: Patch<Option<String>>,
}

#[derive(Deserialize, Debug, Default)]
struct SearchParams {
    pub search: Option<String>,
}

/// Maps a catalog failure onto the wire statuses: validation map as the 400
/// body, missing entity as a bare 404, storage faults as logged 500s.
fn error_response(endpoint: &'static str, err: CatalogError) -> Response {
    match err {
        CatalogError::NotFound => StatusCode::NOT_FOUND.into_response(),
        CatalogError::Validation(errors) => {
            (StatusCode::BAD_REQUEST, Json(errors)).into_response()
        }
        CatalogError::Storage(err) => {
            error!("Storage failure on {}: {:#}", endpoint, err);
            metrics::record_error("storage", endpoint);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// The action routes hide every failure kind behind an empty 400; the cause
/// only shows up in the logs.
fn collapsed_response<T: Serialize>(
    endpoint: &'static str,
    result: CatalogResult<T>,
) -> Response {
    match result {
        Ok(entity) => Json(entity).into_response(),
        Err(err) => {
            warn!("Collapsed failure on {}: {}", endpoint, err);
            metrics::record_error("collapsed", endpoint);
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

// =============================================================================
// Artists
// =============================================================================

async fn list_artists(
    State(catalog): State<GuardedCatalogStore>,
    Query(query): Query<CollectionQuery>,
) -> Response {
    match catalog.list_artists(&query) {
        Ok(artists) => Json(artists).into_response(),
        Err(err) => error_response("/artistas/", err),
    }
}

async fn create_artist(
    _session: Session,
    State(catalog): State<GuardedCatalogStore>,
    Json(payload): Json<ArtistPayload>,
) -> Response {
    match catalog.create_artist(payload) {
        Ok(artist) => (StatusCode::CREATED, Json(artist)).into_response(),
        Err(err) => error_response("/artistas/", err),
    }
}

async fn get_artist(State(catalog): State<GuardedCatalogStore>, Path(id): Path<i64>) -> Response {
    match catalog.get_resolved_artist(id) {
        Ok(Some(artist)) => Json(artist).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => error_response("/artistas/{id}/", err),
    }
}

async fn put_artist(
    _session: Session,
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
    Json(payload): Json<ArtistPayload>,
) -> Response {
    match catalog.update_artist(id, payload, true) {
        Ok(artist) => Json(artist).into_response(),
        Err(err) => error_response("/artistas/{id}/", err),
    }
}

async fn patch_artist(
    _session: Session,
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
    Json(payload): Json<ArtistPayload>,
) -> Response {
    match catalog.update_artist(id, payload, false) {
        Ok(artist) => Json(artist).into_response(),
        Err(err) => error_response("/artistas/{id}/", err),
    }
}

async fn delete_artist(
    _session: Session,
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
) -> Response {
    match catalog.delete_artist(id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => error_response("/artistas/{id}/", err),
    }
}

async fn remove_artist_photo(
    _session: Session,
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
) -> Response {
    collapsed_response(
        "/artistas/{id}/remover_foto/",
        catalog.remove_artist_photo(id),
    )
}

// =============================================================================
// Genres
// =============================================================================

async fn list_genres(
    State(catalog): State<GuardedCatalogStore>,
    Query(query): Query<CollectionQuery>,
) -> Response {
    match catalog.list_genres(&query) {
        Ok(genres) => Json(genres).into_response(),
        Err(err) => error_response("/generos/", err),
    }
}

async fn create_genre(
    State(catalog): State<GuardedCatalogStore>,
    Json(payload): Json<GenrePayload>,
) -> Response {
    match catalog.create_genre(payload) {
        Ok(genre) => (StatusCode::CREATED, Json(genre)).into_response(),
        Err(err) => error_response("/generos/", err),
    }
}

async fn get_genre(State(catalog): State<GuardedCatalogStore>, Path(id): Path<i64>) -> Response {
    match catalog.get_resolved_genre(id) {
        Ok(Some(genre)) => Json(genre).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => error_response("/generos/{id}/", err),
    }
}

async fn put_genre(
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
    Json(payload): Json<GenrePayload>,
) -> Response {
    match catalog.update_genre(id, payload, true) {
        Ok(genre) => Json(genre).into_response(),
        Err(err) => error_response("/generos/{id}/", err),
    }
}

async fn patch_genre(
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
    Json(payload): Json<GenrePayload>,
) -> Response {
    match catalog.update_genre(id, payload, false) {
        Ok(genre) => Json(genre).into_response(),
        Err(err) => error_response("/generos/{id}/", err),
    }
}

async fn delete_genre(State(catalog): State<GuardedCatalogStore>, Path(id): Path<i64>) -> Response {
    match catalog.delete_genre(id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => error_response("/generos/{id}/", err),
    }
}

// =============================================================================
// Songs
// =============================================================================

async fn list_songs(
    State(catalog): State<GuardedCatalogStore>,
    Query(query): Query<SongQuery>,
) -> Response {
    match catalog.list_songs(&query) {
        Ok(songs) => Json(songs).into_response(),
        Err(err) => error_response("/musicas/", err),
    }
}

async fn create_song(
    State(catalog): State<GuardedCatalogStore>,
    Json(payload): Json<SongPayload>,
) -> Response {
    match catalog.create_song(payload) {
        Ok(song) => (StatusCode::CREATED, Json(song)).into_response(),
        Err(err) => error_response("/musicas/", err),
    }
}

async fn get_song(State(catalog): State<GuardedCatalogStore>, Path(id): Path<i64>) -> Response {
    match catalog.get_resolved_song(id) {
        Ok(Some(song)) => Json(song).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => error_response("/musicas/{id}/", err),
    }
}

async fn put_song(
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
    Json(payload): Json<SongPayload>,
) -> Response {
    match catalog.update_song(id, payload, true) {
        Ok(song) => Json(song).into_response(),
        Err(err) => error_response("/musicas/{id}/", err),
    }
}

async fn patch_song(
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
    Json(payload): Json<SongPayload>,
) -> Response {
    match catalog.update_song(id, payload, false) {
        Ok(song) => Json(song).into_response(),
        Err(err) => error_response("/musicas/{id}/", err),
    }
}

async fn delete_song(State(catalog): State<GuardedCatalogStore>, Path(id): Path<i64>) -> Response {
    match catalog.delete_song(id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => error_response("/musicas/{id}/", err),
    }
}

async fn like_song(State(catalog): State<GuardedCatalogStore>, Path(id): Path<i64>) -> Response {
    collapsed_response("/musicas/{id}/gostar/", catalog.like_song(id))
}

async fn dislike_song(
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
) -> Response {
    collapsed_response("/musicas/{id}/nao_gostar/", catalog.dislike_song(id))
}

// =============================================================================
// Search and statistics
// =============================================================================

async fn search_catalog(
    State(search): State<CatalogSearch>,
    Query(params): Query<SearchParams>,
) -> Response {
    match search.search(params.search.as_deref()) {
        Ok(results) => Json(json!({ "results": results })).into_response(),
        Err(err) => error_response("/pesquisa/", err),
    }
}

async fn get_statistics(State(catalog): State<GuardedCatalogStore>) -> Response {
    match catalog.counts() {
        Ok(counts) => {
            metrics::update_catalog_items(&counts);
            Json(counts).into_response()
        }
        Err(err) => error_response("/estatisticas/", err),
    }
}

// =============================================================================
// Auth
// =============================================================================

async fn login(
    State(user_manager): State<UserManager>,
    body: Option<Json<LoginBody>>,
) -> Response {
    // A bodyless request fails the same way as one with missing fields.
    let (username, password) = match body {
        Some(Json(LoginBody {
            username: Some(username),
            password: Some(password),
        })) => (username, password),
        _ => return StatusCode::FORBIDDEN.into_response(),
    };

    let user = match user_manager.verify_password(&username, &password) {
        Ok(Some(user)) => user,
        Ok(None) => {
            metrics::record_login_attempt("failure");
            return StatusCode::FORBIDDEN.into_response();
        }
        Err(err) => {
            error!("Login check failed against the user store: {:#}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let token = match user_manager.issue_token(user.id) {
        Ok(token) => token,
        Err(err) => {
            error!("Token issuance failed for {}: {:#}", user.username, err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(err) = user_manager.record_login(user.id) {
        error!("Failed to stamp last login for {}: {:#}", user.username, err);
    }
    // Reload so the profile carries the login that was just stamped.
    let user = match user_manager.get_user(user.id) {
        Ok(Some(fresh)) => fresh,
        _ => user,
    };
    metrics::record_login_attempt("success");

    let cookie = Cookie::build(Cookie::new(
        session::COOKIE_SESSION_TOKEN_KEY,
        token.0.clone(),
    ))
    .path("/")
    .http_only(true)
    .build();

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(json!({ "user": user.profile(), "token": token.0 })),
    )
        .into_response()
}

async fn logout(_session: Session) -> Response {
    // The token stays valid; only the cookie is dropped.
    let cookie = Cookie::build(Cookie::new(session::COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build();

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
    )
        .into_response()
}

fn required_credential(
    errors: &mut FieldErrors,
    field: &str,
    value: Patch<Option<String>>,
) -> Option<String> {
    match value {
        Patch::Absent => {
            add_field_error(errors, field, REQUIRED_MESSAGE);
            None
        }
        Patch::Set(None) => {
            add_field_error(errors, field, NOT_NULL_MESSAGE);
            None
        }
        Patch::Set(Some(value)) => {
            if value.is_empty() {
                add_field_error(errors, field, NOT_BLANK_MESSAGE);
                None
            } else {
                Some(value)
            }
        }
    }
}

async fn issue_token(
    State(user_manager): State<UserManager>,
    body: Option<Json<TokenBody>>,
) -> Response {
    let body = body.map(|Json(body)| body).unwrap_or_default();

    let mut errors = FieldErrors::new();
    let username = required_credential(&mut errors, "username", body.username);
    let password = required_credential(&mut errors, "password", body.password);

    let (username, password) = match (username, password) {
        (Some(username), Some(password)) if errors.is_empty() => (username, password),
        _ => return (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
    };

    match user_manager.verify_password(&username, &password) {
        Ok(Some(user)) => match user_manager.issue_token(user.id) {
            Ok(token) => {
                metrics::record_login_attempt("success");
                Json(json!({ "token": token.0 })).into_response()
            }
            Err(err) => {
                error!("Token issuance failed for {}: {:#}", username, err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Ok(None) => {
            metrics::record_login_attempt("failure");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "non_field_errors": [INVALID_CREDENTIALS_MESSAGE] })),
            )
                .into_response()
        }
        Err(err) => {
            error!("Login check failed against the user store: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// =============================================================================
// Wiring
// =============================================================================

impl ServerState {
    fn new(
        config: ServerConfig,
        catalog_store: Arc<dyn CatalogStore>,
        search: CatalogSearch,
        user_manager: UserManager,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            catalog_store,
            search,
            user_manager,
            hash: option_env!("GIT_HASH").unwrap_or("unknown").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    catalog_store: Arc<dyn CatalogStore>,
    user_manager: UserManager,
) -> Result<Router> {
    let search = CatalogSearch::new(catalog_store.clone());
    let state = ServerState::new(config.clone(), catalog_store, search, user_manager);

    let catalog_routes: Router = Router::new()
        .route("/artistas/", get(list_artists).post(create_artist))
        .route(
            "/artistas/{id}/",
            get(get_artist)
                .put(put_artist)
                .patch(patch_artist)
                .delete(delete_artist),
        )
        .route("/artistas/{id}/remover_foto/", post(remove_artist_photo))
        .route("/generos/", get(list_genres).post(create_genre))
        .route(
            "/generos/{id}/",
            get(get_genre)
                .put(put_genre)
                .patch(patch_genre)
                .delete(delete_genre),
        )
        .route("/musicas/", get(list_songs).post(create_song))
        .route(
            "/musicas/{id}/",
            get(get_song)
                .put(put_song)
                .patch(patch_song)
                .delete(delete_song),
        )
        .route("/musicas/{id}/gostar/", post(like_song))
        .route("/musicas/{id}/nao_gostar/", post(dislike_song))
        .route("/pesquisa/", get(search_catalog))
        .route("/estatisticas/", get(get_statistics))
        .with_state(state.clone());

    let auth_routes: Router = Router::new()
        .route("/login/", post(login))
        .route("/logout/", post(logout))
        .route("/token/", post(issue_token))
        .with_state(state.clone());

    let home_router: Router = match &state.config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .merge(catalog_routes)
        .nest("/auth", auth_routes);

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    catalog_store: Arc<dyn CatalogStore>,
    user_manager: UserManager,
    config: ServerConfig,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, catalog_store, user_manager)?;

    let metrics_app: Router = Router::new().route("/metrics", get(metrics::metrics_handler));
    let metrics_listener =
        tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port)).await?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            error!("Metrics server terminated: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    Ok(axum::serve(listener, app).await?)
}
