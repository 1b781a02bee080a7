//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own catalog and user databases.

use super::constants::*;
use super::fixtures::{create_test_catalog, create_test_db_with_users};
use acervo_server::catalog_store::{CatalogStore, SqliteCatalogStore};
use acervo_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use acervo_server::user::{SqliteUserStore, UserManager};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated catalog and user databases
///
/// When dropped, the server gracefully shuts down and temp resources are
/// cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// User manager on the same database the server reads, for seeding
    /// extra accounts and tokens from tests
    pub user_manager: UserManager,

    // Private fields - keep resources alive until drop
    _temp_catalog_dir: TempDir,
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// This function:
    /// 1. Creates a temporary catalog with test data
    /// 2. Creates a temporary database with test users
    /// 3. Binds to a random port (127.0.0.1:0)
    /// 4. Spawns the server in a background task
    /// 5. Waits for the server to be ready
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - Catalog or database creation fails
    /// - Port binding fails
    /// - Server fails to start
    /// - Server doesn't become ready within timeout
    pub async fn spawn() -> Self {
        // Create temporary test resources
        let (temp_catalog_dir, catalog_db_path) =
            create_test_catalog().expect("Failed to create test catalog");
        let (temp_db_dir, user_db_path) =
            create_test_db_with_users().expect("Failed to create test database");

        // Open SQLite catalog store
        let catalog_store: Arc<dyn CatalogStore> = Arc::new(
            SqliteCatalogStore::new(&catalog_db_path, 1).expect("Failed to open catalog store"),
        );

        // Create user manager
        let user_store =
            SqliteUserStore::new(&user_db_path).expect("Failed to open user store");
        let user_manager = UserManager::new(Arc::new(user_store));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        // Build the app. The metrics listener only exists in run_server,
        // never in tests, so its port is irrelevant here.
        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            metrics_port: 0,
            frontend_dir_path: None,
        };

        let app = make_app(config, catalog_store, user_manager.clone())
            .expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        // Wait for server to be ready
        let server = Self {
            base_url,
            port,
            user_manager,
            _temp_catalog_dir: temp_catalog_dir,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    // Server is ready
                    return;
                }
                _ => {
                    // Server not ready yet, wait and retry
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDirs are cleaned up automatically
    }
}
