//! Single-user login
//!
//! When `server.auth` is configured every form route sits behind
//! [`require_login`]. A successful login stores a random token in
//! [`SessionStore`] and hands it to the browser as an `HttpOnly` cookie.
//! Sessions live in memory and are lost on restart.
//!
//! The configured password is an argon2 PHC string; see [`hash_password`].

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::flash::{flash_redirect, flashes_from_query, render_flashes, Flash};
use crate::forms::{parse_form, parse_pairs};
use crate::{page_response, AppState};

pub const SESSION_COOKIE: &str = "cashform_session";

/// Where to go after login when `next` is missing or unusable
const DEFAULT_LANDING: &str = "/entry";

/// Issued session tokens and the user each belongs to
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn issue(&self, username: &str) -> String {
        let token = cashform_utils::generate_guid();
        self.sessions.write().await.insert(token.clone(), username.to_string());
        token
    }

    /// The user owning `token`, if it is a live session
    pub async fn validate(&self, token: &str) -> Option<String> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

/// Argon2 PHC string for `password`, the form `server.auth.password_hash` expects
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Whether `password` matches `password_hash`. A malformed hash matches nothing.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            log::error!("server.auth.password_hash is not a usable argon2 hash: {}", e);
            false
        }
    }
}

/// Session token from the request's cookies
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Accept only a path on this site as a post-login target
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.contains("://") =>
        {
            path.to_string()
        }
        _ => DEFAULT_LANDING.to_string(),
    }
}

async fn is_logged_in(state: &AppState, headers: &HeaderMap) -> bool {
    match session_token(headers) {
        Some(token) => state.sessions.validate(&token).await.is_some(),
        None => false,
    }
}

/// Redirect to the login form unless the request carries a live session.
/// Passes everything through when no user is configured.
pub async fn require_login(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.config.server.auth.is_none() || is_logged_in(&state, request.headers()).await {
        return next.run(request).await;
    }
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    log::debug!("Unauthenticated request for {}, redirecting to login", target);
    Redirect::to(&format!("/login?next={}", urlencoding::encode(&target))).into_response()
}

/// Login form
pub async fn page_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::extract::RawQuery(query): axum::extract::RawQuery,
) -> Response {
    if state.config.server.auth.is_none() || is_logged_in(&state, &headers).await {
        return Redirect::to(DEFAULT_LANDING).into_response();
    }
    let query = query.unwrap_or_default();
    let next = parse_pairs(&query)
        .into_iter()
        .find(|(key, _)| key == "next")
        .map(|(_, value)| value)
        .unwrap_or_default();

    let inner_content = format!(
        r#"<div class='max-w-md mx-auto mt-12'>
            {}
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h2 class='text-2xl font-bold mb-6'>Sign in</h2>
                <form method='post' action='/login' class='space-y-4'>
                    <input type='hidden' name='next' value='{}'>
                    <div>
                        <label class='block text-sm font-medium text-gray-700 mb-1'>Username</label>
                        <input type='text' name='username' required class='w-full px-3 py-2.5 border rounded-lg focus:ring-2 focus:ring-indigo-500'>
                    </div>
                    <div>
                        <label class='block text-sm font-medium text-gray-700 mb-1'>Password</label>
                        <input type='password' name='password' required class='w-full px-3 py-2.5 border rounded-lg focus:ring-2 focus:ring-indigo-500'>
                    </div>
                    <button type='submit' class='w-full px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Sign in</button>
                </form>
            </div>
        </div>"#,
        render_flashes(&flashes_from_query(&state.flashes, &query).await),
        cashform_utils::escape_html(&next)
    );
    Html(page_response(&headers, "Sign in", "/login", &inner_content)).into_response()
}

/// Check the submitted credentials against the configured user
pub async fn login_submit(State(state): State<AppState>, body: String) -> Response {
    let Some(auth) = &state.config.server.auth else {
        return Redirect::to(DEFAULT_LANDING).into_response();
    };
    let fields = parse_form(&body);
    let username = fields.get("username").map(|s| s.trim()).unwrap_or("");
    let password = fields.get("password").map(String::as_str).unwrap_or("");
    let next = fields.get("next").map(String::as_str).filter(|n| !n.is_empty());

    let submitted = password.to_string();
    let password_hash = auth.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&submitted, &password_hash))
        .await
        .unwrap_or(false);

    if username != auth.username || !verified {
        let message = format!("Invalid username or password for username {}", username);
        log::error!("{}", message);
        let back = match next {
            Some(next) => format!("/login?next={}", urlencoding::encode(next)),
            None => "/login".to_string(),
        };
        return flash_redirect(&state.flashes, &back, &[Flash::danger(message)]).await.into_response();
    }

    let token = state.sessions.issue(username).await;
    log::info!("Successful login for user {}", username);
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token);
    let mut response = flash_redirect(
        &state.flashes,
        &safe_next(next),
        &[Flash::success(format!("Successful login for user {}", username))],
    )
    .await
    .into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// Drop the session and return to the landing page
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(&token).await;
    }
    let mut response = Redirect::to("/").into_response();
    let expired = format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE);
    if let Ok(value) = HeaderValue::from_str(&expired) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_checked_against_hash() {
        let stored = hash_password("hunter2").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(!stored.contains("hunter2"));
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
        assert!(!verify_password("", &stored));
        assert_ne!(hash_password("hunter2").unwrap(), stored);
    }

    #[test]
    fn test_plaintext_in_hash_field_never_matches() {
        assert!(!verify_password("hunter2", "hunter2"));
        assert!(!verify_password("", ""));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = SessionStore::new();
        let token = store.issue("alex").await;
        assert_eq!(token.len(), 32);
        assert_eq!(store.validate(&token).await.as_deref(), Some("alex"));
        store.revoke(&token).await;
        assert!(store.validate(&token).await.is_none());
        assert!(store.validate("made-up").await.is_none());
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/balances")), "/balances");
        assert_eq!(safe_next(Some("/transactions/Assets%3AChecking?x=1")), "/transactions/Assets%3AChecking?x=1");
        assert_eq!(safe_next(Some("https://evil.example/")), "/entry");
        assert_eq!(safe_next(Some("//evil.example/")), "/entry");
        assert_eq!(safe_next(Some("/\\evil.example")), "/entry");
        assert_eq!(safe_next(Some("")), "/entry");
        assert_eq!(safe_next(None), "/entry");
    }

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; cashform_session=abc123"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("cashform_session="));
        assert!(session_token(&headers).is_none());
        assert!(session_token(&HeaderMap::new()).is_none());
    }
}
