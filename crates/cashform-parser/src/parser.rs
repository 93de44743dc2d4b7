//! Line-based parser for the Beancount subset used by the ledger file

use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::directives::{
    CloseDirective, Directive, OpenDirective, OptionDirective, Posting, RawDirective,
    SpannedDirective, Transaction,
};
use crate::error::ParseError;
use crate::types::{unescape_string, Account, Amount, Meta, SpanInfo, StringValue};

fn date_regex() -> &'static Regex {
    static DATE_PATTERN: OnceCell<Regex> = OnceCell::new();
    DATE_PATTERN.get_or_init(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})\s+(.+)$").unwrap())
}

fn meta_regex() -> &'static Regex {
    static META_PATTERN: OnceCell<Regex> = OnceCell::new();
    META_PATTERN.get_or_init(|| Regex::new(r"^([a-z][A-Za-z0-9_-]*):\s*(.*)$").unwrap())
}

/// Simple line-based parser for ledger files
pub struct SimpleBeancountParser;

impl SimpleBeancountParser {
    /// Parse ledger file content
    pub fn parse(content: &str) -> Result<Vec<SpannedDirective>, ParseError> {
        Self::parse_with_source(content, None)
    }

    /// Parse ledger file content, tagging every directive with its source path
    pub fn parse_with_source(content: &str, source: Option<&str>) -> Result<Vec<SpannedDirective>, ParseError> {
        let mut directives = Vec::new();
        let lines: Vec<&str> = content.lines().collect();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim();

            // Skip empty lines and comments (;, #)
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                i += 1;
                continue;
            }

            // Org-mode section headers ("* Banking") are comments
            if trimmed.starts_with('*') {
                i += 1;
                continue;
            }

            // Indented continuation lines belong to the directive on the first line
            let mut end = i + 1;
            while end < lines.len() {
                let next = lines[end];
                if !next.trim().is_empty() && (next.starts_with(' ') || next.starts_with('\t')) {
                    end += 1;
                } else {
                    break;
                }
            }

            let line_number = i + 1;
            let block = &lines[i..end];
            let data = Self::parse_block(block, line_number)?;
            directives.push(SpannedDirective {
                data,
                span: SpanInfo { start: line_number, end },
                source: source.map(|s| s.to_string()),
            });
            i = end;
        }

        Ok(directives)
    }

    /// Parse one top-level line plus its continuation lines
    fn parse_block(block: &[&str], line_number: usize) -> Result<Directive, ParseError> {
        let first = block[0].trim();
        let continuation = &block[1..];

        let Some(caps) = date_regex().captures(first) else {
            if first.starts_with("option ") {
                if let Some(option) = Self::parse_option(first) {
                    return Ok(option);
                }
            }
            return Ok(Self::raw(block));
        };

        let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") else {
            return Ok(Self::raw(block));
        };
        let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let parsed = if rest.starts_with('*') || rest.starts_with('!') || rest.starts_with("txn") {
            Self::parse_transaction_full(rest, date, continuation, line_number)?
        } else if rest.starts_with("open ") {
            Self::parse_open(rest, date, continuation)
        } else if rest.starts_with("close ") && continuation.is_empty() {
            Self::parse_close(rest, date)
        } else {
            None
        };

        Ok(parsed.unwrap_or_else(|| Self::raw(block)))
    }

    fn raw(block: &[&str]) -> Directive {
        Directive::Raw(RawDirective {
            content: block.join("\n"),
        })
    }

    /// Parse a transaction header and its metadata/posting lines.
    /// Returns None when any line is outside the supported subset.
    fn parse_transaction_full(
        rest: &str,
        date: NaiveDate,
        continuation: &[&str],
        line_number: usize,
    ) -> Result<Option<Directive>, ParseError> {
        // FLAG ["payee"] "narration" #tags ^links
        static TXN_HEADER: OnceCell<Regex> = OnceCell::new();
        let header_regex = TXN_HEADER.get_or_init(|| {
            Regex::new(r#"^([*!]|txn)\s*(?:"((?:[^"\\]|\\.)*)")?\s*(?:"((?:[^"\\]|\\.)*)")?\s*(.*)$"#).unwrap()
        });

        let Some(caps) = header_regex.captures(rest) else {
            return Ok(None);
        };

        let flag = match &caps[1] {
            "txn" => "*".to_string(),
            other => other.to_string(),
        };
        let first = caps.get(2).map(|m| unescape_string(m.as_str()));
        let second = caps.get(3).map(|m| unescape_string(m.as_str()));
        let (payee, narration) = match (first, second) {
            (Some(p), Some(n)) => (Some(p), n),
            (Some(n), None) => (None, n),
            _ => (None, String::new()),
        };

        let mut tags = Vec::new();
        let mut links = Vec::new();
        if let Some(remaining) = caps.get(4) {
            for part in remaining.as_str().split_whitespace() {
                if part.starts_with(';') {
                    break;
                }
                if let Some(tag) = part.strip_prefix('#') {
                    tags.push(tag.to_string());
                } else if let Some(link) = part.strip_prefix('^') {
                    links.push(link.to_string());
                } else {
                    return Ok(None);
                }
            }
        }

        let mut meta = Meta::default();
        let mut postings = Vec::new();

        for (offset, line) in continuation.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with(';') {
                continue;
            }
            if let Some((key, value)) = Self::parse_meta_line(trimmed) {
                meta.insert(key, value);
                continue;
            }
            match Self::parse_posting(trimmed, line_number + offset + 1)? {
                Some(posting) => postings.push(posting),
                None => return Ok(None),
            }
        }

        Ok(Some(Directive::Transaction(Transaction {
            date,
            flag,
            payee,
            narration,
            tags,
            links,
            postings,
            meta,
        })))
    }

    fn parse_meta_line(line: &str) -> Option<(String, StringValue)> {
        let caps = meta_regex().captures(line)?;
        let raw = caps[2].trim();
        let value = match raw.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            Some(inner) if raw.len() >= 2 => StringValue::Quote(unescape_string(inner)),
            _ => StringValue::Unquote(raw.to_string()),
        };
        Some((caps[1].to_string(), value))
    }

    /// Parse a single posting line: [FLAG] ACCOUNT [AMOUNT CURRENCY] [; comment]
    fn parse_posting(line: &str, line_number: usize) -> Result<Option<Posting>, ParseError> {
        static POSTING_PATTERN: OnceCell<Regex> = OnceCell::new();
        let posting_regex = POSTING_PATTERN.get_or_init(|| {
            Regex::new(r#"^([!*])?\s*((?:Assets|Liabilities|Equity|Income|Expenses)(?::\S+)?)(?:\s+(-?[\d,]*\.?\d+)\s+([A-Z][A-Z0-9'._-]*))?\s*(?:;.*)?$"#).unwrap()
        });

        let Some(caps) = posting_regex.captures(line) else {
            return Ok(None);
        };
        let Some(account) = caps.get(2).and_then(|m| Account::from_name(m.as_str())) else {
            return Ok(None);
        };

        let amount = match (caps.get(3), caps.get(4)) {
            (Some(amt), Some(curr)) => {
                let amount_str = amt.as_str().replace(',', "");
                let amount: rust_decimal::Decimal = amount_str
                    .parse()
                    .map_err(|e| ParseError::syntax(line_number, format!("invalid amount '{}': {}", amt.as_str(), e)))?;
                Some(Amount {
                    amount,
                    currency: curr.as_str().to_string(),
                })
            }
            _ => None,
        };

        Ok(Some(Posting {
            flag: caps.get(1).map(|m| m.as_str().to_string()),
            account,
            amount,
        }))
    }

    fn parse_open(rest: &str, date: NaiveDate, continuation: &[&str]) -> Option<Directive> {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let account = Account::from_name(parts.get(1)?)?;
        let currencies = parts[2..]
            .iter()
            .flat_map(|s| s.split(','))
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        let mut meta = Meta::default();
        for line in continuation {
            let trimmed = line.trim();
            if trimmed.starts_with(';') {
                continue;
            }
            let (key, value) = Self::parse_meta_line(trimmed)?;
            meta.insert(key, value);
        }

        Some(Directive::Open(OpenDirective {
            date,
            account,
            currencies,
            meta,
        }))
    }

    fn parse_close(rest: &str, date: NaiveDate) -> Option<Directive> {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        if parts.len() != 2 {
            return None;
        }
        Some(Directive::Close(CloseDirective {
            date,
            account: Account::from_name(parts[1])?,
        }))
    }

    fn parse_option(line: &str) -> Option<Directive> {
        static OPTION_PATTERN: OnceCell<Regex> = OnceCell::new();
        let option_regex = OPTION_PATTERN.get_or_init(|| {
            Regex::new(r#"^option\s+"((?:[^"\\]|\\.)*)"\s+"((?:[^"\\]|\\.)*)"\s*$"#).unwrap()
        });
        let caps = option_regex.captures(line)?;
        Some(Directive::Option(OptionDirective {
            key: unescape_string(&caps[1]),
            value: unescape_string(&caps[2]),
        }))
    }
}

// ==================== Tests ====================
