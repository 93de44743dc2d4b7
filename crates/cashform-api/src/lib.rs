//! HTTP server for the cashform forms
//!
//! Routes are organized into modules:
//! - routes::transactions: entry form, deletion, listings
//! - routes::accounts: account add/delete, balances
//! - routes::easy_buttons: easy-button management
//!
//! Every request opens the ledger afresh through [`AppState::open_ledger`];
//! nothing from the book is kept between requests.

pub mod auth;
pub mod error;
pub mod flash;
pub mod forms;
pub mod routes;

use axum::{
    extract::{RawQuery, State},
    http::HeaderMap,
    middleware,
    response::Html,
    routing::{get, post},
    Router,
};
use cashform_config::{Config, ConfigErrorSeverity, EasyButtonStore, EasyButtons};
use cashform_core::{BeancountStorage, CoreError, CoreResult, Ledger, StorageRef, SyncRef};
use std::sync::Arc;
use tokio::net::TcpListener;

pub use auth::{hash_password, SessionStore};
pub use error::ApiError;
pub use flash::FlashStore;

use flash::{flashes_from_query, render_flashes, Flash};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: StorageRef,
    pub sync: SyncRef,
    pub easy_buttons: Arc<EasyButtonStore>,
    pub sessions: Arc<SessionStore>,
    pub flashes: Arc<FlashStore>,
}

impl AppState {
    /// File-backed ledger and the sync target named in the config
    pub fn new(config: Config) -> Self {
        let storage: StorageRef = Arc::new(BeancountStorage::new(config.ledger_path()));
        let sync = cashform_core::sync::from_config(&config);
        Self::with_backends(config, storage, sync)
    }

    pub fn with_backends(config: Config, storage: StorageRef, sync: SyncRef) -> Self {
        let easy_buttons = Arc::new(EasyButtonStore::new(config.easy_buttons_path()));
        Self {
            config: Arc::new(config),
            storage,
            sync,
            easy_buttons,
            sessions: Arc::new(SessionStore::new()),
            flashes: Arc::new(FlashStore::new()),
        }
    }

    /// Sync the local copy, then load the ledger for one request.
    /// A failed sync is logged and the local copy is used as it is.
    pub async fn open_ledger(&self) -> CoreResult<Ledger> {
        if let Err(e) = self.sync.prepare().await {
            log::warn!("Could not refresh ledger from {}: {}", self.sync.describe(), e);
        }
        Ledger::open(self.storage.clone()).await
    }

    /// Push a saved change out. Returns a banner when that fails.
    pub async fn publish(&self, message: &str, what: &str) -> Option<Flash> {
        match self.sync.publish(message).await {
            Ok(()) => None,
            Err(e) => {
                log::error!("{} not synced to {}: {}", what, self.sync.describe(), e);
                Some(Flash::danger(format!("{} not synced to {}:\n{}", what, self.sync.describe(), e)))
            }
        }
    }

    /// Current easy buttons. Any problem with the file means no buttons this time.
    pub async fn load_easy_buttons(&self) -> EasyButtons {
        match self.easy_buttons.load().await {
            Ok(buttons) => buttons,
            Err(e) => {
                let level = match e.severity() {
                    ConfigErrorSeverity::Info => log::Level::Debug,
                    _ => log::Level::Warn,
                };
                log::log!(level, "No easy buttons loaded from {}: {}", self.easy_buttons.path().display(), e);
                EasyButtons::new()
            }
        }
    }

    pub fn symbol(&self) -> &str {
        &self.config.currency.symbol
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::accounts::{account_add, account_delete, api_accounts, page_accounts, page_balances};
    use routes::easy_buttons::{api_easy_buttons, easy_button_add, easy_button_delete, page_easy_buttons};
    use routes::transactions::{
        api_transactions, delete_submit, entry_submit, page_account_transactions, page_delete, page_entry,
        page_transactions,
    };

    let protected = Router::new()
        // Form pages
        .route("/entry", get(page_entry).post(entry_submit))
        .route("/delete", get(page_delete).post(delete_submit))
        .route("/accounts", get(page_accounts))
        .route("/accounts/add", post(account_add))
        .route("/accounts/delete", post(account_delete))
        .route("/transactions", get(page_transactions))
        .route("/transactions/:account", get(page_account_transactions))
        .route("/balances", get(page_balances))
        .route("/easy-buttons", get(page_easy_buttons))
        .route("/easy-buttons/add", post(easy_button_add))
        .route("/easy-buttons/delete", post(easy_button_delete))
        // API endpoints
        .route("/api/accounts", get(api_accounts))
        .route("/api/transactions", get(api_transactions))
        .route("/api/easy-buttons", get(api_easy_buttons))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_login));

    Router::new()
        .route("/", get(index_page))
        .route("/login", get(auth::page_login).post(auth::login_submit))
        .route("/logout", get(auth::logout))
        .route("/api/health", get(health_check))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

// ==================== Template Functions ====================

/// Base HTML template
pub fn base_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Cashform</title>
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
    <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gray-50 text-gray-900">
    {}
</body>
</html>"#,
        title, content
    )
}

/// Navigation sidebar
pub fn nav_sidebar(current_path: &str) -> String {
    let links = [
        ("/entry", "New transaction", "📝"),
        ("/delete", "Delete transaction", "🗑️"),
        ("/transactions", "Transactions", "📋"),
        ("/balances", "Balances", "💰"),
        ("/accounts", "Accounts", "🗂️"),
        ("/easy-buttons", "Easy buttons", "⚡"),
    ];

    let mut nav = String::from("<div class='bg-white border-r h-screen flex flex-col'><div class='p-4 border-b'><a href='/' class='text-xl font-bold text-indigo-600'>Cashform</a></div><ul class='flex-1 py-2 space-y-1 px-2'>");

    for (path, label, icon) in &links {
        let active_class = if current_path.starts_with(path) {
            "bg-indigo-50 text-indigo-600"
        } else {
            "text-gray-600 hover:bg-gray-50"
        };
        nav.push_str(&format!(
            r#"<li><a href='{}' class='flex items-center gap-2 px-3 py-2 rounded-lg {}'>{}<span>{}</span></a></li>"#,
            path, active_class, icon, label
        ));
    }
    nav.push_str("</ul><div class='p-4 border-t'><a href='/logout' class='text-sm text-gray-500 hover:text-gray-700'>Log out</a></div></div>");
    nav
}

/// Check if request is from HTMX (partial page update)
fn is_htmx_request(headers: &HeaderMap) -> bool {
    headers.get("hx-request").is_some()
}

/// Wrap content for full page or HTMX partial
pub fn page_response(headers: &HeaderMap, title: &str, current_path: &str, inner_content: &str) -> String {
    if is_htmx_request(headers) {
        format!(r#"<main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>"#, inner_content)
    } else {
        base_html(
            title,
            &format!(
                r#"<div class='flex flex-col h-screen'>
    <div class='flex flex-1 overflow-hidden'>
        <aside class='w-64 flex-shrink-0'>{}</aside>
        <main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>
    </div>
</div>"#,
                nav_sidebar(current_path),
                inner_content
            ),
        )
    }
}

/// Banner shown in place of page content when the ledger cannot be opened
pub fn ledger_error_flash(err: &CoreError) -> Flash {
    log::error!("Could not open ledger: {}", err);
    Flash::danger(format!("Could not open the ledger file:\n{}", err.to_details()))
}

/// Landing page
async fn index_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let sign_in = if state.config.server.auth.is_some() {
        "<a href='/login' class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Sign in</a>"
    } else {
        "<a href='/entry' class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Enter a transaction</a>"
    };
    let inner_content = format!(
        r#"{}
        <div class='max-w-2xl bg-white rounded-xl shadow-sm p-6'>
            <h2 class='text-2xl font-bold mb-2'>Cashform</h2>
            <p class='text-gray-600 mb-6'>Record cash transactions in the household ledger from any device.</p>
            {}
        </div>"#,
        render_flashes(&flashes_from_query(&state.flashes, &query.unwrap_or_default()).await),
        sign_in
    );
    Html(page_response(&headers, "Home", "/", &inner_content))
}

/// Start the HTTP server and serve until Ctrl-C
pub async fn start_server(config: Config) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    if config.server.auth.is_none() {
        log::warn!("No server.auth configured, every page is open to anyone who can reach {}", addr);
    }

    let state = AppState::new(config);
    if let Err(e) = state.sync.ensure_ready().await {
        log::error!("Sync target {} is not ready: {}", state.sync.describe(), e);
    }
    log::info!("Ledger at {}, syncing with {}", state.storage.describe(), state.sync.describe());

    let router = create_router(state);
    let listener = TcpListener::bind(&addr).await?;
    log::info!("Starting Cashform server on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for shutdown signal: {}", e);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_is_public() {
        let app = app(true);
        let response = get(&app.router, "/api/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_protected_route_redirects_to_login() {
        let app = app(true);
        let response = get(&app.router, "/balances").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login?next=%2Fbalances");
    }

    #[tokio::test]
    async fn test_login_flow() {
        let app = app(true);

        let response = post_form(&app.router, "/login", "username=alex&password=wrong&next=%2Fbalances").await;
        let (path, flashes) = app.location(&response).await;
        assert_eq!(path, "/login");
        assert!(flashes[0].message.contains("Invalid username or password"));

        let response = post_form(&app.router, "/login", "username=alex&password=hunter2&next=%2Fbalances").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(app.location(&response).await.0, "/balances");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(cookie.contains("HttpOnly"));
        let session = cookie.split(';').next().unwrap().to_string();

        let authed = |uri: &str| {
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, session.clone())
                .body(Body::empty())
                .unwrap()
        };
        let response = app.router.clone().oneshot(authed("/balances")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.router.clone().oneshot(authed("/logout")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let response = app.router.clone().oneshot(authed("/balances")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_login_ignores_offsite_next() {
        let app = app(true);
        let response = post_form(
            &app.router,
            "/login",
            "username=alex&password=hunter2&next=https%3A%2F%2Fevil.example%2F",
        )
        .await;
        assert_eq!(app.location(&response).await.0, "/entry");
    }

    #[tokio::test]
    async fn test_banner_text_comes_only_from_the_server() {
        let app = app(false);
        let html = body_text(get(&app.router, "/?ok=Your+ledger+was+wiped&err=Call+555").await).await;
        assert!(!html.contains("ledger was wiped"));
        assert!(!html.contains("Call 555"));

        let response = post_form(&app.router, "/accounts/add", "parent=Assets&new_account=Savings").await;
        let target = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        assert!(target.starts_with("/accounts?flash="));
        let html = body_text(get(&app.router, &target).await).await;
        assert!(html.contains("added to the ledger file."));
        let html = body_text(get(&app.router, &target).await).await;
        assert!(!html.contains("added to the ledger file."));
    }

    #[tokio::test]
    async fn test_open_without_auth() {
        let app = app(false);
        let response = get(&app.router, "/balances").await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = get(&app.router, "/login").await;
        assert_eq!(app.location(&response).await.0, "/entry");
    }
}
