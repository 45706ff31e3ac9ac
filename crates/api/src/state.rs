//! Shared application state for the Axum API server.

use sentinel_engine::book::SharedBook;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub book: SharedBook,
}

impl AppState {
    pub fn new(book: SharedBook) -> Self {
        Self { book }
    }
}
