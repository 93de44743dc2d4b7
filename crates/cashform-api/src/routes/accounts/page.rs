//! Account pages
//!
//! Endpoints:
//! - page_accounts: Add and delete forms
//! - account_add / account_delete: Form targets
//! - page_balances: Rolled-up balance of every account

use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::response::{Html, Redirect};
use cashform_core::{account_balances, add_account, delete_account_with_inheritance, list_accounts};
use cashform_utils::{escape_html, format_money};

use crate::flash::{flash_redirect, flashes_from_query, render_flashes, Flash};
use crate::forms::{parse_form, validate_new_account};
use crate::routes::{account_link, account_options};
use crate::{ledger_error_flash, page_response, AppState};

/// Add and delete forms
pub async fn page_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let mut flashes = flashes_from_query(&state.flashes, &query.unwrap_or_default()).await;
    let accounts = match state.open_ledger().await {
        Ok(ledger) => {
            let names = list_accounts(ledger.book());
            ledger.close();
            names
        }
        Err(e) => {
            flashes.push(ledger_error_flash(&e));
            vec![]
        }
    };
    let options = account_options(&accounts, None);

    let inner_content = format!(
        r#"{flashes}
        <div class='mb-6'><h2 class='text-2xl font-bold'>Accounts</h2></div>
        <div class='grid grid-cols-1 lg:grid-cols-2 gap-6'>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Add an account</h3>
                <form method='post' action='/accounts/add' class='space-y-4'>
                    <div>
                        <label class='block text-sm font-medium text-gray-700 mb-1'>Parent</label>
                        <select name='parent' required class='w-full px-3 py-2.5 border rounded-lg'>{options}</select>
                    </div>
                    <div>
                        <label class='block text-sm font-medium text-gray-700 mb-1'>Name</label>
                        <input type='text' name='new_account' placeholder='Groceries' required class='w-full px-3 py-2.5 border rounded-lg'>
                    </div>
                    <button type='submit' class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Add</button>
                </form>
            </div>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Delete an account</h3>
                <p class='text-sm text-gray-500 mb-4'>Its transactions move to the most general ancestor that is not a placeholder.</p>
                <form method='post' action='/accounts/delete' class='space-y-4'>
                    <select name='account' required class='w-full px-3 py-2.5 border rounded-lg'>{options}</select>
                    <button type='submit' class='px-4 py-2 bg-red-600 text-white rounded-lg hover:bg-red-700'>Delete</button>
                </form>
            </div>
        </div>"#,
        flashes = render_flashes(&flashes),
        options = options,
    );
    Html(page_response(&headers, "Accounts", "/accounts", &inner_content))
}

/// Create an account under an existing parent
pub async fn account_add(State(state): State<AppState>, body: String) -> Redirect {
    let input = match validate_new_account(&parse_form(&body)) {
        Ok(input) => input,
        Err(errors) => {
            let flashes: Vec<Flash> = errors.into_iter().map(Flash::danger).collect();
            return flash_redirect(&state.flashes, "/accounts", &flashes).await;
        }
    };

    let result = match state.open_ledger().await {
        Ok(mut ledger) => {
            let result = add_account(&mut ledger, &input.name, &input.parent).await;
            ledger.close();
            result
        }
        Err(e) => Err(e),
    };

    let mut flashes = Vec::new();
    match result {
        Ok(fullname) => {
            log::info!("Account {} added", fullname);
            flashes.push(Flash::success(format!("Account \"{}\" added to the ledger file.", fullname)));
            if let Some(warning) = state.publish(&format!("Add account {}", fullname), "New account").await {
                flashes.push(warning);
            }
        }
        Err(e) => {
            log::error!("Account {} not added under {}: {}", input.name, input.parent, e);
            flashes.push(Flash::danger(format!(
                "Account \"{}\" was NOT added to the ledger file:\n{}",
                input.name, e
            )));
        }
    }
    flash_redirect(&state.flashes, "/accounts", &flashes).await
}

/// Delete an account, moving its transactions to the inheriting ancestor
pub async fn account_delete(State(state): State<AppState>, body: String) -> Redirect {
    let fields = parse_form(&body);
    let name = fields.get("account").map(|a| a.trim()).unwrap_or("").to_string();
    if name.is_empty() {
        return flash_redirect(&state.flashes, "/accounts", &[Flash::danger("Choose an account to delete")]).await;
    }

    let result = match state.open_ledger().await {
        Ok(mut ledger) => {
            let result = delete_account_with_inheritance(&mut ledger, &name).await;
            ledger.close();
            result
        }
        Err(e) => Err(e),
    };

    let mut flashes = Vec::new();
    match result {
        Ok(report) => {
            let mut message = format!("Account deleted from the ledger file:\n{}", report.deleted);
            if report.reassigned_splits > 0 {
                message.push_str(&format!(
                    "\n{} split(s) totalling {} moved to {}",
                    report.reassigned_splits,
                    format_money(state.symbol(), report.reassigned_total),
                    report.ancestor
                ));
            }
            if report.reassigned_passthrough > 0 {
                message.push_str(&format!(
                    "\n{} multi-currency posting(s) moved to {}",
                    report.reassigned_passthrough, report.ancestor
                ));
            }
            flashes.push(Flash::success(message));
            if let Some(warning) = state.publish(&format!("Delete account {}", report.deleted), "Deletion").await {
                flashes.push(warning);
            }
        }
        Err(e) => {
            log::error!("Account {} not deleted: {}", name, e);
            flashes.push(Flash::danger(format!(
                "Account was NOT deleted from the ledger file:\n{}\n{}",
                name, e
            )));
        }
    }
    flash_redirect(&state.flashes, "/accounts", &flashes).await
}

/// Balance of every account
pub async fn page_balances(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let (flashes, balances) = match state.open_ledger().await {
        Ok(ledger) => {
            let balances = account_balances(ledger.book());
            ledger.close();
            (vec![], balances)
        }
        Err(e) => (vec![ledger_error_flash(&e)], vec![]),
    };

    let rows: String = balances
        .iter()
        .map(|entry| {
            let depth = entry.fullname.matches(':').count();
            let (name_cell, weight) = if entry.placeholder {
                (escape_html(&entry.fullname), "text-gray-500")
            } else {
                (account_link(&entry.fullname), "")
            };
            let amount_class = if entry.balance.is_sign_negative() && !entry.balance.is_zero() {
                "text-red-600"
            } else {
                "text-gray-900"
            };
            format!(
                r#"<tr class='border-b hover:bg-gray-50'>
                    <td class='py-2 pr-4 {}' style='padding-left: {}rem'>{}</td>
                    <td class='py-2 text-right font-medium {}'>{}</td>
                </tr>"#,
                weight,
                depth as f32 * 1.5,
                name_cell,
                amount_class,
                format_money(state.symbol(), entry.balance)
            )
        })
        .collect();

    let inner_content = format!(
        r#"{}
        <div class='mb-6'><h2 class='text-2xl font-bold'>Balances</h2></div>
        <div class='bg-white rounded-xl shadow-sm p-6'>
            <table class='w-full text-sm'>
                <thead><tr class='text-left text-gray-500 border-b'><th class='py-2'>Account</th><th class='py-2 text-right'>Balance</th></tr></thead>
                <tbody>{}</tbody>
            </table>
        </div>"#,
        render_flashes(&flashes),
        rows
    );
    Html(page_response(&headers, "Balances", "/balances", &inner_content))
}
