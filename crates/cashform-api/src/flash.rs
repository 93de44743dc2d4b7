//! One-shot status banners carried across a redirect
//!
//! The banners stay on the server in [`FlashStore`]; the redirect only carries
//! an opaque `flash` key, taken (and forgotten) by the page that reads it.

use axum::response::Redirect;
use cashform_utils::escape_html;
use std::collections::VecDeque;
use tokio::sync::Mutex;

use crate::forms::parse_pairs;

/// Query parameter holding the banner key
pub const FLASH_PARAM: &str = "flash";

/// Oldest unread banners are dropped past this many redirects
const MAX_PENDING: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Danger,
            message: message.into(),
        }
    }
}

/// Banners waiting for the page a redirect points at
#[derive(Debug, Default)]
pub struct FlashStore {
    pending: Mutex<VecDeque<(String, Vec<Flash>)>>,
}

impl FlashStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `flashes` and return the key that reads them back once
    pub async fn put(&self, flashes: Vec<Flash>) -> String {
        let key = cashform_utils::generate_guid();
        let mut pending = self.pending.lock().await;
        if pending.len() >= MAX_PENDING {
            pending.pop_front();
        }
        pending.push_back((key.clone(), flashes));
        key
    }

    /// Banners stored under `key`. Unknown or already read keys give none.
    pub async fn take(&self, key: &str) -> Vec<Flash> {
        let mut pending = self.pending.lock().await;
        match pending.iter().position(|(k, _)| k == key) {
            Some(index) => pending.remove(index).map(|(_, flashes)| flashes).unwrap_or_default(),
            None => vec![],
        }
    }
}

/// Redirect to `path`, leaving the banners for the next page to pick up
pub async fn flash_redirect(store: &FlashStore, path: &str, flashes: &[Flash]) -> Redirect {
    if flashes.is_empty() {
        return Redirect::to(path);
    }
    let key = store.put(flashes.to_vec()).await;
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{}{}{}={}", path, separator, FLASH_PARAM, key))
}

/// Banners named by the `flash` key in a raw query string
pub async fn flashes_from_query(store: &FlashStore, query: &str) -> Vec<Flash> {
    let key = parse_pairs(query)
        .into_iter()
        .find(|(name, _)| name == FLASH_PARAM)
        .map(|(_, value)| value);
    match key {
        Some(key) => store.take(&key).await,
        None => vec![],
    }
}

pub fn render_flashes(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|flash| {
            let (box_class, icon, text_class) = match flash.kind {
                FlashKind::Success => ("bg-green-50 border-green-200", "<span class='text-green-600'>✓</span>", "text-green-800"),
                FlashKind::Danger => ("bg-red-50 border-red-200", "<span class='text-red-600'>✗</span>", "text-red-800"),
            };
            format!(
                "<div class='{} border rounded-lg p-4 mb-4'><div class='flex items-start gap-2'>{}<p class='text-sm {}'>{}</p></div></div>",
                box_class,
                icon,
                text_class,
                escape_html(&flash.message).replace('\n', "<br>")
            )
        })
        .collect()
}
