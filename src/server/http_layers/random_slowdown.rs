//! Dev-only layer that delays every request by a random amount, for poking
//! at frontend loading states against a local server.
#![allow(dead_code)] // Compiled in via the slowdown feature

use axum::{body::Body, http::Request, middleware::Next, response::IntoResponse};
use rand::Rng;
use std::time::Duration;

const MIN_DELAY_MS: u64 = 200;
const MAX_DELAY_MS: u64 = 1500;

pub async fn slowdown_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let delay_ms = rand::rng().random_range(MIN_DELAY_MS..MAX_DELAY_MS);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    next.run(request).await
}
