//! Transaction pages
//!
//! Endpoints:
//! - page_entry / entry_submit: New transaction form with easy buttons
//! - page_delete / delete_submit: Pick a recent transaction and delete it
//! - page_transactions: Last N transactions
//! - page_account_transactions: Last N transactions touching one account

use axum::extract::{Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::response::{Html, Redirect};
use cashform_core::{
    add_transaction, delete_transaction, last_n_transactions, summarize, transactions_for_account, NewTransaction,
    TransactionView,
};
use cashform_utils::{escape_html, format_money};

use crate::flash::{flash_redirect, flashes_from_query, render_flashes, Flash};
use crate::forms::{parse_form, validate_entry};
use crate::routes::{account_link, account_options};
use crate::{ledger_error_flash, page_response, AppState};

const CARD: &str = "bg-white rounded-xl shadow-sm p-6";
const INPUT: &str = "w-full px-3 py-2.5 border rounded-lg focus:ring-2 focus:ring-indigo-500";
const SUBMIT: &str = "px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700";

/// New transaction form
pub async fn page_entry(
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

    let buttons: String = state
        .load_easy_buttons()
        .await
        .iter()
        .map(|(name, button)| {
            format!(
                r#"<button type='button' onclick='applyEasyButton(this)' data-source='{}' data-dest='{}' data-descrip='{}'
                    class='px-3 py-2 border rounded-lg bg-white hover:bg-indigo-50'>{} {}</button>"#,
                escape_html(&button.source),
                escape_html(&button.dest),
                escape_html(&button.descrip),
                escape_html(&button.emoji),
                escape_html(name)
            )
        })
        .collect();
    let buttons = if buttons.is_empty() {
        "<p class='text-sm text-gray-500'>No easy buttons yet. <a href='/easy-buttons' class='text-indigo-600 hover:underline'>Add one</a>.</p>".to_string()
    } else {
        buttons
    };

    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    let options = account_options(&accounts, None);
    let inner_content = format!(
        r#"{flashes}
        <div class='mb-6'><h2 class='text-2xl font-bold'>New transaction</h2></div>
        <div class='{card} mb-6'>
            <h3 class='text-lg font-semibold mb-4'>Easy buttons</h3>
            <div class='flex flex-wrap gap-2'>{buttons}</div>
        </div>
        <div class='{card}'>
            <form method='post' action='/entry' class='space-y-4'>
                <div class='grid grid-cols-2 gap-4'>
                    <div>
                        <label class='block text-sm font-medium text-gray-700 mb-1'>Date</label>
                        <input type='date' name='date' value='{today}' required class='{input}'>
                    </div>
                    <div>
                        <label class='block text-sm font-medium text-gray-700 mb-1'>Amount</label>
                        <input type='text' id='amount' name='amount' inputmode='decimal' placeholder='4.20' required class='{input}'>
                    </div>
                </div>
                <div>
                    <label class='block text-sm font-medium text-gray-700 mb-1'>Description</label>
                    <input type='text' id='description' name='description' required class='{input}'>
                </div>
                <div class='grid grid-cols-2 gap-4'>
                    <div>
                        <label class='block text-sm font-medium text-gray-700 mb-1'>Debit (money leaves)</label>
                        <select id='debit' name='debit' required class='{input}'>{options}</select>
                    </div>
                    <div>
                        <label class='block text-sm font-medium text-gray-700 mb-1'>Credit (money arrives)</label>
                        <select id='credit' name='credit' required class='{input}'>{options}</select>
                    </div>
                </div>
                <button type='submit' class='{submit}'>Save</button>
            </form>
        </div>
        <script>
            function applyEasyButton(button) {{
                document.getElementById('debit').value = button.dataset.source;
                document.getElementById('credit').value = button.dataset.dest;
                document.getElementById('description').value = button.dataset.descrip;
                document.getElementById('amount').focus();
            }}
        </script>"#,
        flashes = render_flashes(&flashes),
        card = CARD,
        buttons = buttons,
        today = today,
        input = INPUT,
        options = options,
        submit = SUBMIT,
    );
    Html(page_response(&headers, "New transaction", "/entry", &inner_content))
}

/// Save a transaction from the entry form
pub async fn entry_submit(State(state): State<AppState>, body: String) -> Redirect {
    let fields = parse_form(&body);
    let input = match validate_entry(&fields) {
        Ok(input) => input,
        Err(errors) => {
            let flashes: Vec<Flash> = errors.into_iter().map(Flash::danger).collect();
            return flash_redirect(&state.flashes, "/entry", &flashes).await;
        }
    };
    let amount_text = format_money(state.symbol(), input.amount);

    let mut ledger = match state.open_ledger().await {
        Ok(ledger) => ledger,
        Err(e) => {
            return flash_redirect(
                &state.flashes,
                "/entry",
                &[Flash::danger(format!("Transaction for {} was not saved to the ledger file:\n{}", amount_text, e))],
            )
            .await;
        }
    };
    let new = NewTransaction {
        description: input.description.clone(),
        amount: input.amount,
        debit: input.debit,
        credit: input.credit,
        currency: state.config.currency.code.clone(),
        date: input.date,
        enter_date: input.date.and_time(chrono::Utc::now().time()),
    };
    let result = add_transaction(&mut ledger, new).await;
    ledger.close();

    let mut flashes = Vec::new();
    match result {
        Ok(id) => {
            log::info!("Transaction {} for {} saved", id, amount_text);
            flashes.push(Flash::success(format!("Transaction for {} saved to the ledger file.", amount_text)));
            if let Some(warning) = state
                .publish(&input.description, &format!("Transaction for {}", amount_text))
                .await
            {
                flashes.push(warning);
            }
        }
        Err(e) => {
            log::error!("Transaction for {} not saved: {}", amount_text, e);
            flashes.push(Flash::danger(format!(
                "Transaction for {} was not saved to the ledger file:\n{}",
                amount_text, e
            )));
        }
    }
    flash_redirect(&state.flashes, "/entry", &flashes).await
}

/// Pick one of the recent transactions to delete
pub async fn page_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let mut flashes = flashes_from_query(&state.flashes, &query.unwrap_or_default()).await;
    let views = match recent(&state).await {
        Ok(views) => views,
        Err(flash) => {
            flashes.push(flash);
            vec![]
        }
    };

    let options: String = views
        .iter()
        .map(|view| {
            let token = escape_html(&summarize(view, state.symbol()));
            format!("<option value='{0}'>{0}</option>", token)
        })
        .collect();

    let inner_content = format!(
        r#"{}
        <div class='mb-6'><h2 class='text-2xl font-bold'>Delete a transaction</h2></div>
        <div class='{}'>
            <form method='post' action='/delete' class='space-y-4'>
                <div>
                    <label class='block text-sm font-medium text-gray-700 mb-1'>Transaction</label>
                    <select name='transaction' required class='{} font-mono text-sm'>{}</select>
                </div>
                <button type='submit' class='px-4 py-2 bg-red-600 text-white rounded-lg hover:bg-red-700'>Delete</button>
            </form>
        </div>"#,
        render_flashes(&flashes),
        CARD,
        INPUT,
        options
    );
    Html(page_response(&headers, "Delete transaction", "/delete", &inner_content))
}

/// Delete the transaction whose token was submitted
pub async fn delete_submit(State(state): State<AppState>, body: String) -> Redirect {
    let fields = parse_form(&body);
    let token = fields.get("transaction").map(|t| t.trim()).unwrap_or("").to_string();
    if token.is_empty() {
        return flash_redirect(&state.flashes, "/delete", &[Flash::danger("Choose a transaction to delete")]).await;
    }

    let result = match state.open_ledger().await {
        Ok(mut ledger) => {
            let result = delete_transaction(&mut ledger, &token).await;
            ledger.close();
            result
        }
        Err(e) => Err(e),
    };

    let mut flashes = Vec::new();
    match result {
        Ok(removed) => {
            flashes.push(Flash::success(format!("Transaction deleted from the ledger file:\n{}", token)));
            let message = format!("Delete transaction: {}", removed.description);
            if let Some(warning) = state.publish(&message, "Deletion").await {
                flashes.push(warning);
            }
        }
        Err(e) => {
            log::error!("Transaction not deleted: {}", e);
            flashes.push(Flash::danger(format!(
                "Transaction was NOT deleted from the ledger file:\n{}\n{}",
                token, e
            )));
        }
    }
    flash_redirect(&state.flashes, "/entry", &flashes).await
}

/// The configured number of recent transactions
async fn recent(state: &AppState) -> Result<Vec<TransactionView>, Flash> {
    let ledger = state.open_ledger().await.map_err(|e| ledger_error_flash(&e))?;
    let views = last_n_transactions(ledger.book(), state.config.transactions.list_limit);
    ledger.close();
    Ok(views)
}

fn listing_heading(limit: usize) -> String {
    if limit == 0 {
        "All transactions".to_string()
    } else {
        format!("Last {} transactions", limit)
    }
}

fn render_table(views: &[TransactionView], symbol: &str) -> String {
    if views.is_empty() {
        return "<p class='text-gray-500'>No transactions to show.</p>".to_string();
    }
    let rows: String = views
        .iter()
        .map(|view| {
            format!(
                r#"<tr class='border-b hover:bg-gray-50'>
                    <td class='py-2 pr-4 whitespace-nowrap'>{}</td>
                    <td class='py-2 pr-4'>{}</td>
                    <td class='py-2 pr-4'>{}</td>
                    <td class='py-2 pr-4'>{}</td>
                    <td class='py-2 text-right font-medium'>{}</td>
                </tr>"#,
                view.date.format("%Y-%m-%d"),
                escape_html(&view.description),
                account_link(&view.source),
                account_link(&view.dest),
                format_money(symbol, view.amount)
            )
        })
        .collect();
    format!(
        r#"<table class='w-full text-sm'>
            <thead><tr class='text-left text-gray-500 border-b'>
                <th class='py-2 pr-4'>Date</th><th class='py-2 pr-4'>Description</th><th class='py-2 pr-4'>Source</th><th class='py-2 pr-4'>Destination</th><th class='py-2 text-right'>Amount</th>
            </tr></thead>
            <tbody>{}</tbody>
        </table>"#,
        rows
    )
}

/// Most recent transactions
pub async fn page_transactions(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let (flashes, views) = match recent(&state).await {
        Ok(views) => (vec![], views),
        Err(flash) => (vec![flash], vec![]),
    };
    let inner_content = format!(
        r#"{}
        <div class='mb-6'><h2 class='text-2xl font-bold'>{}</h2></div>
        <div class='{}'>{}</div>"#,
        render_flashes(&flashes),
        listing_heading(state.config.transactions.list_limit),
        CARD,
        render_table(&views, state.symbol())
    );
    Html(page_response(&headers, "Transactions", "/transactions", &inner_content))
}

/// Most recent transactions with `account` as source or destination
pub async fn page_account_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(account): Path<String>,
) -> Html<String> {
    let (flashes, views) = match recent(&state).await {
        Ok(views) => (vec![], transactions_for_account(&views, &account)),
        Err(flash) => (vec![flash], vec![]),
    };
    let inner_content = format!(
        r#"{}
        <div class='mb-6'>
            <a href='/transactions' class='text-sm text-indigo-600 hover:underline'>All recent transactions</a>
            <h2 class='text-2xl font-bold'>{}</h2>
            <p class='text-gray-500'>{}</p>
        </div>
        <div class='{}'>{}</div>"#,
        render_flashes(&flashes),
        escape_html(&account),
        listing_heading(state.config.transactions.list_limit),
        CARD,
        render_table(&views, state.symbol())
    );
    Html(page_response(&headers, &escape_html(&account), "/transactions", &inner_content))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;
    use cashform_core::{BookStorage, CoreError, Ledger};

    #[tokio::test]
    async fn test_entry_page_lists_accounts_and_buttons() {
        let app = app(false);
        let button = cashform_config::EasyButton {
            source: "Assets:Checking".to_string(),
            dest: "Expenses:Food".to_string(),
            descrip: "Coffee".to_string(),
            emoji: "☕".to_string(),
        };
        app.state.easy_buttons.add("Coffee", button).await.unwrap();

        let response = get(&app.router, "/entry").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<option value='Expenses:Food'>"));
        assert!(!html.contains("<option value='Expenses'>"));
        assert!(html.contains("data-descrip='Coffee'"));
    }

    #[tokio::test]
    async fn test_entry_submit_saves() {
        let app = app(false);
        let response = post_form(
            &app.router,
            "/entry",
            "date=2024-03-01&description=Coffee&amount=4.2&debit=Assets%3AChecking&credit=Expenses%3AFood",
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let (path, flashes) = app.location(&response).await;
        assert_eq!(path, "/entry");
        assert_eq!(flashes[0].message, "Transaction for $4.20 saved to the ledger file.");

        let ledger = Ledger::open(app.storage.clone()).await.unwrap();
        let food = ledger.book().balance("Expenses:Food", false);
        assert_eq!(food, rust_decimal::Decimal::new(420, 2));
        assert_eq!(ledger.book().balance("Assets:Checking", false), rust_decimal::Decimal::new(48031, 2));
    }

    #[tokio::test]
    async fn test_entry_submit_reports_failures() {
        let app = app(false);
        let response = post_form(&app.router, "/entry", "date=2024-03-01&description=Coffee&amount=%244.20").await;
        let (_, flashes) = app.location(&response).await;
        assert!(flashes.iter().any(|f| f.message.contains("dollar sign")));

        let response = post_form(
            &app.router,
            "/entry",
            "date=2024-03-01&description=Coffee&amount=4.20&debit=Assets%3ASavings&credit=Expenses%3AFood",
        )
        .await;
        let (_, flashes) = app.location(&response).await;
        assert!(flashes[0].message.starts_with("Transaction for $4.20 was not saved"));
        assert!(flashes[0].message.contains("Assets:Savings"));
        assert_eq!(app.storage.save_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_token() {
        let app = app(false);
        let html = body_text(get(&app.router, "/delete").await).await;
        assert!(html.contains("GUID: sub1"));

        let token = "Txn: Streaming,Amount: $15.49,Date: 2024-01-05,Source: Checking,Dest: Subscriptions,GUID: sub1";
        let body = format!("transaction={}", urlencoding::encode(token));
        let response = post_form(&app.router, "/delete", &body).await;
        let (path, flashes) = app.location(&response).await;
        assert_eq!(path, "/entry");
        assert!(flashes[0].message.starts_with("Transaction deleted from the ledger file:\n"));

        let book = app.storage.load().await.unwrap();
        assert!(book.transaction("sub1").is_none());

        let response = post_form(&app.router, "/delete", &body).await;
        let (_, flashes) = app.location(&response).await;
        assert!(flashes[0].message.starts_with("Transaction was NOT deleted"));
        assert!(flashes[0].message.contains(&CoreError::TransactionNotFound { id: "sub1".to_string() }.to_string()));
    }

    #[tokio::test]
    async fn test_listing_pages() {
        let app = app(false);
        let html = body_text(get(&app.router, "/transactions").await).await;
        assert!(html.contains("Last 50 transactions"));
        assert!(html.contains("Streaming"));
        assert!(html.contains("$15.49"));

        let html = body_text(get(&app.router, "/transactions/Equity%3AOpening").await).await;
        assert!(html.contains("Opening balance"));
        assert!(!html.contains("Streaming"));
    }
}
