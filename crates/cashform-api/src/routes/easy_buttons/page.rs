//! Easy-button pages
//!
//! Endpoints:
//! - page_easy_buttons: Current buttons with add and delete forms
//! - easy_button_add / easy_button_delete: Form targets

use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::response::{Html, Redirect};
use cashform_utils::escape_html;

use crate::flash::{flash_redirect, flashes_from_query, render_flashes, Flash};
use crate::forms::{easy_button_label, easy_button_name, parse_form, validate_easy_button};
use crate::routes::account_options;
use crate::{ledger_error_flash, page_response, AppState};

const INPUT: &str = "w-full px-3 py-2.5 border rounded-lg focus:ring-2 focus:ring-indigo-500";

pub async fn page_easy_buttons(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let mut flashes = flashes_from_query(&state.flashes, &query.unwrap_or_default()).await;
    let accounts: Vec<String> = match state.open_ledger().await {
        Ok(ledger) => {
            let mut names: Vec<String> = ledger
                .book()
                .accounts()
                .iter()
                .filter(|a| !a.placeholder)
                .map(|a| a.fullname.clone())
                .collect();
            names.sort();
            ledger.close();
            names
        }
        Err(e) => {
            flashes.push(ledger_error_flash(&e));
            vec![]
        }
    };
    let buttons = state.load_easy_buttons().await;

    let rows: String = buttons
        .iter()
        .map(|(name, button)| {
            format!(
                r#"<tr class='border-b'>
                    <td class='py-2 pr-4'>{} {}</td>
                    <td class='py-2 pr-4'>{}</td>
                    <td class='py-2 pr-4'>{}</td>
                    <td class='py-2'>{}</td>
                </tr>"#,
                escape_html(&button.emoji),
                escape_html(name),
                escape_html(&button.source),
                escape_html(&button.dest),
                escape_html(&button.descrip)
            )
        })
        .collect();
    let labels: String = buttons
        .iter()
        .map(|(name, button)| format!("<option value='{0}'>{0}</option>", escape_html(&easy_button_label(name, button))))
        .collect();
    let options = account_options(&accounts, None);

    let inner_content = format!(
        r#"{flashes}
        <div class='mb-6'><h2 class='text-2xl font-bold'>Easy buttons</h2></div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <table class='w-full text-sm'>
                <thead><tr class='text-left text-gray-500 border-b'>
                    <th class='py-2 pr-4'>Button</th><th class='py-2 pr-4'>Debit</th><th class='py-2 pr-4'>Credit</th><th class='py-2'>Description</th>
                </tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </div>
        <div class='grid grid-cols-1 lg:grid-cols-2 gap-6'>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Add an easy button</h3>
                <form method='post' action='/easy-buttons/add' class='space-y-4'>
                    <input type='text' name='name' placeholder='Name' required class='{input}'>
                    <select name='source' required class='{input}'>{options}</select>
                    <select name='dest' required class='{input}'>{options}</select>
                    <input type='text' name='descrip' placeholder='Description' required class='{input}'>
                    <input type='text' name='emoji' placeholder='Emoji' required class='{input}'>
                    <button type='submit' class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Add</button>
                </form>
            </div>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Delete an easy button</h3>
                <form method='post' action='/easy-buttons/delete' class='space-y-4'>
                    <select name='delete' required class='{input}'>{labels}</select>
                    <button type='submit' class='px-4 py-2 bg-red-600 text-white rounded-lg hover:bg-red-700'>Delete</button>
                </form>
            </div>
        </div>"#,
        flashes = render_flashes(&flashes),
        rows = rows,
        input = INPUT,
        options = options,
        labels = labels,
    );
    Html(page_response(&headers, "Easy buttons", "/easy-buttons", &inner_content))
}

pub async fn easy_button_add(State(state): State<AppState>, body: String) -> Redirect {
    let fields = parse_form(&body);
    let (name, button) = match validate_easy_button(&fields) {
        Ok(valid) => valid,
        Err(errors) => {
            let name = fields.get("name").map(|n| n.trim()).unwrap_or("");
            let message = format!("Easy button \"{}\" was not saved successfully.\n{}", name, errors.join("\n"));
            return flash_redirect(&state.flashes, "/easy-buttons", &[Flash::danger(message)]).await;
        }
    };

    let flash = match state.easy_buttons.add(&name, button).await {
        Ok(_) => {
            log::info!("Easy button {} saved to {}", name, state.easy_buttons.path().display());
            Flash::success(format!("Easy button \"{}\" added successfully.", name))
        }
        Err(e) => {
            log::error!("Easy button {} not saved: {}", name, e);
            Flash::danger(format!("Easy button \"{}\" was not saved successfully.\n{}", name, e))
        }
    };
    flash_redirect(&state.flashes, "/easy-buttons", &[flash]).await
}

pub async fn easy_button_delete(State(state): State<AppState>, body: String) -> Redirect {
    let fields = parse_form(&body);
    let name = easy_button_name(fields.get("delete").map(String::as_str).unwrap_or("")).to_string();
    if name.is_empty() {
        return flash_redirect(&state.flashes, "/easy-buttons", &[Flash::danger("Choose an easy button to delete")]).await;
    }

    let flash = match state.easy_buttons.remove(&name).await {
        Ok(_) => {
            log::info!("Easy button {} deleted", name);
            Flash::success(format!("Easy button \"{}\" deleted successfully.", name))
        }
        Err(e) => {
            log::error!("Easy button {} not deleted: {}", name, e);
            Flash::danger(format!("Easy button \"{}\" was not deleted successfully.\n{}", name, e))
        }
    };
    flash_redirect(&state.flashes, "/easy-buttons", &[flash]).await
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;

    const COFFEE: &str =
        "name=Coffee&source=Assets%3AChecking&dest=Expenses%3AFood&descrip=Morning+coffee&emoji=%E2%98%95";

    #[tokio::test]
    async fn test_add_and_delete_easy_button() {
        let app = app(false);
        let response = post_form(&app.router, "/easy-buttons/add", COFFEE).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let (path, flashes) = app.location(&response).await;
        assert_eq!(path, "/easy-buttons");
        assert_eq!(flashes[0].message, "Easy button \"Coffee\" added successfully.");

        let buttons = app.state.easy_buttons.load().await.unwrap();
        assert_eq!(buttons["Coffee"].descrip, "Morning coffee");

        let html = body_text(get(&app.router, "/easy-buttons").await).await;
        assert!(html.contains("<option value='Coffee  (☕)'>"));

        let body = format!("delete={}", urlencoding::encode("Coffee  (☕)"));
        let response = post_form(&app.router, "/easy-buttons/delete", &body).await;
        let (_, flashes) = app.location(&response).await;
        assert_eq!(flashes[0].message, "Easy button \"Coffee\" deleted successfully.");
        assert!(app.state.easy_buttons.load().await.unwrap().is_empty());

        let response = post_form(&app.router, "/easy-buttons/delete", &body).await;
        let (_, flashes) = app.location(&response).await;
        assert!(flashes[0].message.starts_with("Easy button \"Coffee\" was not deleted successfully."));
    }

    #[tokio::test]
    async fn test_add_easy_button_rejects_two_emoji() {
        let app = app(false);
        let body = COFFEE.replace("emoji=%E2%98%95", "emoji=%E2%98%95%E2%98%95");
        let response = post_form(&app.router, "/easy-buttons/add", &body).await;
        let (_, flashes) = app.location(&response).await;
        assert_eq!(
            flashes[0].message,
            "Easy button \"Coffee\" was not saved successfully.\nOnly one emoji is allowed"
        );
        assert!(!app.state.easy_buttons.path().exists());
    }
}
