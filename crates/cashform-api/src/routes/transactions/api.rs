//! Transactions API endpoint
//!
//! Endpoints:
//! - api_transactions: Recent transactions with their selection tokens (JSON)

use axum::extract::{Query, State};
use axum::Json;
use cashform_core::{last_n_transactions, summarize, transactions_for_account, TransactionView};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::AppState;

/// One listed transaction plus the token the delete form posts back
#[derive(Debug, Serialize)]
pub struct TransactionItem {
    #[serde(flatten)]
    pub view: TransactionView,
    pub token: String,
}

/// `?limit=` overrides the configured listing size, `?account=` filters by full account name
pub async fn api_transactions(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<TransactionItem>>, ApiError> {
    let limit = match params.get("limit") {
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| ApiError::BadRequest {
            message: format!("limit must be a non-negative number, got {:?}", raw),
        })?,
        None => state.config.transactions.list_limit,
    };

    let ledger = state.open_ledger().await?;
    let mut views = last_n_transactions(ledger.book(), limit);
    ledger.close();
    if let Some(account) = params.get("account") {
        views = transactions_for_account(&views, account);
    }

    let items = views
        .into_iter()
        .map(|view| TransactionItem {
            token: summarize(&view, state.symbol()),
            view,
        })
        .collect();
    Ok(Json(items))
}
