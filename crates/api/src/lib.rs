//! Read-only HTTP surface over the collateral book.
//!
//! Endpoints:
//! - GET /health
//! - GET /api/assets
//! - GET /api/assets/{erc20}
//! - GET /api/assets/{erc20}/price

pub mod routes;
pub mod state;
