//! Form decoding and validation
//!
//! Handlers take the raw `application/x-www-form-urlencoded` body and hand it
//! to the pure functions here, which either return typed input or the list of
//! messages to show the user.

use cashform_config::EasyButton;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::str::FromStr;

/// Separator between an easy button's name and its emoji in the delete dropdown
const LABEL_SEPARATOR: &str = "  (";

/// Decode `a=1&b=two+words` into ordered pairs. Keys may repeat.
pub fn parse_pairs(encoded: &str) -> Vec<(String, String)> {
    encoded
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

/// Decode a form body. A repeated key keeps its last value.
pub fn parse_form(body: &str) -> HashMap<String, String> {
    parse_pairs(body).into_iter().collect()
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn required<'a>(fields: &'a HashMap<String, String>, key: &str, label: &str, errors: &mut Vec<String>) -> &'a str {
    let value = fields.get(key).map(|v| v.trim()).unwrap_or("");
    if value.is_empty() {
        errors.push(format!("{} is required", label));
    }
    value
}

/// Parse a money amount: digits only, rounded half-up to cents
pub fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Amount is required".to_string());
    }
    if raw.contains('$') || raw.contains(',') {
        return Err("Amount must not contain a dollar sign or commas".to_string());
    }
    let amount = Decimal::from_str(raw).map_err(|_| format!("Amount \"{}\" is not a number", raw))?;
    let amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero".to_string());
    }
    Ok(amount)
}

/// Validated transaction form
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInput {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub debit: String,
    pub credit: String,
}

pub fn validate_entry(fields: &HashMap<String, String>) -> Result<EntryInput, Vec<String>> {
    let mut errors = Vec::new();
    let description = required(fields, "description", "Description", &mut errors).to_string();
    let debit = required(fields, "debit", "Debit account", &mut errors).to_string();
    let credit = required(fields, "credit", "Credit account", &mut errors).to_string();

    let date_raw = required(fields, "date", "Date", &mut errors);
    let date = if date_raw.is_empty() {
        None
    } else {
        match NaiveDate::parse_from_str(date_raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(format!("Date \"{}\" is not a YYYY-MM-DD date", date_raw));
                None
            }
        }
    };

    let amount = match parse_amount(fields.get("amount").map(String::as_str).unwrap_or("")) {
        Ok(amount) => Some(amount),
        Err(message) => {
            errors.push(message);
            None
        }
    };

    match (date, amount) {
        (Some(date), Some(amount)) if errors.is_empty() => Ok(EntryInput {
            date,
            description,
            amount,
            debit,
            credit,
        }),
        _ => Err(errors),
    }
}

/// Validated add-account form
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInput {
    pub name: String,
    pub parent: String,
}

pub fn validate_new_account(fields: &HashMap<String, String>) -> Result<AccountInput, Vec<String>> {
    let mut errors = Vec::new();
    let name = required(fields, "new_account", "Account name", &mut errors).to_string();
    let parent = required(fields, "parent", "Parent account", &mut errors).to_string();
    if errors.is_empty() {
        Ok(AccountInput { name, parent })
    } else {
        Err(errors)
    }
}

/// Validated add-easy-button form
pub fn validate_easy_button(fields: &HashMap<String, String>) -> Result<(String, EasyButton), Vec<String>> {
    let mut errors = Vec::new();
    let name = required(fields, "name", "Name", &mut errors).to_string();
    let source = required(fields, "source", "Debit account", &mut errors).to_string();
    let dest = required(fields, "dest", "Credit account", &mut errors).to_string();
    let descrip = required(fields, "descrip", "Description", &mut errors).to_string();
    let emoji = required(fields, "emoji", "Emoji", &mut errors).to_string();

    if name.contains(LABEL_SEPARATOR) {
        errors.push(format!("Name must not contain \"{}\"", LABEL_SEPARATOR));
    }
    // variation selectors ride along with many emoji
    if !emoji.is_empty() && emoji.chars().filter(|c| *c != '\u{FE0F}').count() != 1 {
        errors.push("Only one emoji is allowed".to_string());
    }

    if errors.is_empty() {
        Ok((
            name,
            EasyButton {
                source,
                dest,
                descrip,
                emoji,
            },
        ))
    } else {
        Err(errors)
    }
}

/// Dropdown label for an easy button, e.g. `Coffee  (☕)`
pub fn easy_button_label(name: &str, button: &EasyButton) -> String {
    format!("{}{}{})", name, LABEL_SEPARATOR, button.emoji)
}

/// Button name back out of a dropdown label
pub fn easy_button_name(label: &str) -> &str {
    label.split(LABEL_SEPARATOR).next().unwrap_or(label).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parse_form_decodes() {
        let form = parse_form("description=Coffee+%26+bagel&debit=Assets%3AChecking&empty=&flag");
        assert_eq!(form["description"], "Coffee & bagel");
        assert_eq!(form["debit"], "Assets:Checking");
        assert_eq!(form["empty"], "");
        assert_eq!(form["flag"], "");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("4.2"), Ok(Decimal::new(420, 2)));
        assert_eq!(parse_amount(" 10 "), Ok(Decimal::new(1000, 2)));
        assert_eq!(parse_amount("1.005"), Ok(Decimal::new(101, 2)));
        assert_eq!(parse_amount("2.344"), Ok(Decimal::new(234, 2)));
        assert!(parse_amount("$4.20").is_err());
        assert!(parse_amount("1,000").is_err());
        assert!(parse_amount("four").is_err());
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("").is_err());
    }

    #[test]
    fn test_validate_entry() {
        let ok = validate_entry(&fields(&[
            ("date", "2024-03-01"),
            ("description", " Coffee "),
            ("amount", "4.20"),
            ("debit", "Assets:Checking"),
            ("credit", "Expenses:Food"),
        ]))
        .unwrap();
        assert_eq!(ok.description, "Coffee");
        assert_eq!(ok.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let errors = validate_entry(&fields(&[("date", "03/01/2024"), ("amount", "$4")])).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.contains("YYYY-MM-DD")));
        assert!(errors.iter().any(|e| e.contains("dollar sign")));
    }

    #[test]
    fn test_validate_easy_button() {
        let (name, button) = validate_easy_button(&fields(&[
            ("name", "Coffee"),
            ("source", "Assets:Checking"),
            ("dest", "Expenses:Food"),
            ("descrip", "Morning coffee"),
            ("emoji", "☕"),
        ]))
        .unwrap();
        assert_eq!(name, "Coffee");
        assert_eq!(button.emoji, "☕");

        let errors = validate_easy_button(&fields(&[
            ("name", "Coffee"),
            ("source", "Assets:Checking"),
            ("dest", "Expenses:Food"),
            ("descrip", "Morning coffee"),
            ("emoji", "☕☕"),
        ]))
        .unwrap_err();
        assert_eq!(errors, vec!["Only one emoji is allowed".to_string()]);
    }

    #[test]
    fn test_easy_button_label_roundtrip() {
        let button = EasyButton {
            source: "Assets:Checking".to_string(),
            dest: "Expenses:Food".to_string(),
            descrip: "Lunch".to_string(),
            emoji: "🥪".to_string(),
        };
        let label = easy_button_label("Lunch out", &button);
        assert_eq!(label, "Lunch out  (🥪)");
        assert_eq!(easy_button_name(&label), "Lunch out");
    }

    #[test]
    fn test_validate_new_account() {
        let input = validate_new_account(&fields(&[("new_account", "Savings"), ("parent", "Assets")])).unwrap();
        assert_eq!(input.parent, "Assets");
        assert_eq!(validate_new_account(&fields(&[])).unwrap_err().len(), 2);
    }
}
