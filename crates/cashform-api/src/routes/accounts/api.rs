//! Accounts API endpoint

use axum::extract::State;
use axum::Json;
use cashform_core::{account_balances, AccountBalance};

use crate::error::ApiError;
use crate::AppState;

/// Every account with its rolled-up balance (JSON API)
pub async fn api_accounts(State(state): State<AppState>) -> Result<Json<Vec<AccountBalance>>, ApiError> {
    let ledger = state.open_ledger().await?;
    let balances = account_balances(ledger.book());
    ledger.close();
    Ok(Json(balances))
}
