//! Collateral status and price routes.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use sentinel_common::error::AppError;
use sentinel_common::types::{PriceQuote, is_valid_address};
use sentinel_engine::book::{AssetSummary, CollateralBook};
use sentinel_engine::collateral::Collateral;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/assets", get(list_assets))
        .route("/api/assets/{erc20}", get(get_asset))
        .route("/api/assets/{erc20}/price", get(get_price))
}

/// GET /api/assets: Every monitored collateral, ordered by address.
async fn list_assets(State(state): State<AppState>) -> Json<Vec<AssetSummary>> {
    Json(state.book.read().await.summaries())
}

/// GET /api/assets/{erc20}: Status of one collateral.
async fn get_asset(
    State(state): State<AppState>,
    Path(erc20): Path<String>,
) -> Result<Json<AssetSummary>, AppError> {
    let book = state.book.read().await;
    let collateral = lookup(&book, &erc20)?;
    Ok(Json(AssetSummary::from(collateral)))
}

/// GET /api/assets/{erc20}/price: Token price band and peg reading.
///
/// Answers 503 while the collateral is disabled or has never been priced.
async fn get_price(
    State(state): State<AppState>,
    Path(erc20): Path<String>,
) -> Result<Json<PriceQuote>, AppError> {
    let book = state.book.read().await;
    let collateral = lookup(&book, &erc20)?;
    let quote = collateral.try_price().map_err(|e| {
        tracing::debug!(erc20 = %erc20, error = %e, "Price unavailable");
        e
    })?;
    Ok(Json(quote))
}

fn lookup<'a>(book: &'a CollateralBook, erc20: &str) -> Result<&'a Collateral, AppError> {
    if !is_valid_address(erc20) {
        return Err(AppError::Validation(format!("{} is not an address", erc20)));
    }
    book.get(erc20)
        .ok_or_else(|| AppError::NotFound(format!("collateral {} is not monitored", erc20)))
}
