//! Easy-buttons API endpoint

use axum::extract::State;
use axum::Json;
use cashform_config::{ConfigError, EasyButtons};

use crate::error::ApiError;
use crate::AppState;

/// Every easy button keyed by name. No file yet means no buttons.
pub async fn api_easy_buttons(State(state): State<AppState>) -> Result<Json<EasyButtons>, ApiError> {
    match state.easy_buttons.load().await {
        Ok(buttons) => Ok(Json(buttons)),
        Err(ConfigError::FileNotFound { .. }) => Ok(Json(EasyButtons::new())),
        Err(e) => Err(e.into()),
    }
}
