use std::str::FromStr;
use std::sync::LazyLock;

use crate::types::{PRICE_COLUMNS, PriceSheet, State, TerminalRow};

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(String),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Failed to parse any data rows from the price sheet")]
    NoRows,
}

const SHEET_DATE_FORMAT: &str = "%A, %d %B %Y";

static RE_TGP_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)TERMINAL GATE PRICES").expect("invalid regex: terminal gate prices link")
});
static RE_CURRENT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Current Effective Date:\s*(.*)").expect("invalid regex: current date")
});
static RE_PREVIOUS_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Previous Effective Date:\s*(.*)").expect("invalid regex: previous date")
});
static RE_STATE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(NSW|QLD|VIC|TAS|SA|NT|WA)\s").expect("invalid regex: state row")
});

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

pub fn parse_pricing_page(html: &str, page_url: &str) -> Result<String, ParseError> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a").unwrap();

    let href = document
        .select(&link_selector)
        .filter(|a| RE_TGP_LINK.is_match(&elem_text(*a)))
        .find_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ParseError::MissingField("'TERMINAL GATE PRICES' link".to_string()))?;

    let base = Url::parse(page_url).map_err(|e| ParseError::UrlParseError(e.to_string()))?;
    let url = base
        .join(href)
        .map_err(|e| ParseError::UrlParseError(format!("{href}: {e}")))?;

    Ok(url.to_string())
}

fn parse_sheet_date(re: &Regex, text: &str, label: &str) -> Result<NaiveDate, ParseError> {
    let raw = re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .ok_or_else(|| ParseError::MissingField(label.to_string()))?;

    NaiveDate::parse_from_str(raw, SHEET_DATE_FORMAT)
        .map_err(|e| ParseError::DateParseError(format!("{label} '{raw}': {e}")))
}

fn parse_table_row(line: &str) -> Option<TerminalRow> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < PRICE_COLUMNS + 2 {
        log::warn!(
            "Skipping row that doesn't seem to have enough columns: '{}'",
            line
        );
        return None;
    }

    let state = State::from_str(tokens[0]).ok()?;
    let split = tokens.len() - PRICE_COLUMNS;
    let terminal = tokens[1..split].join(" ").trim_end_matches('*').to_string();
    let prices: [String; PRICE_COLUMNS] =
        std::array::from_fn(|i| tokens[split + i].to_string());

    Some(TerminalRow {
        state,
        terminal,
        prices,
    })
}

pub fn parse_price_sheet(text: &str) -> Result<PriceSheet, ParseError> {
    let current_date = parse_sheet_date(&RE_CURRENT_DATE, text, "Current Effective Date")?;
    let previous_date = parse_sheet_date(&RE_PREVIOUS_DATE, text, "Previous Effective Date")?;
    log::info!(
        "Current Date: {}, Previous Date: {}",
        current_date,
        previous_date
    );

    let rows: Vec<TerminalRow> = text
        .lines()
        .map(str::trim)
        .filter(|line| RE_STATE_ROW.is_match(line))
        .filter_map(parse_table_row)
        .collect();

    if rows.is_empty() {
        return Err(ParseError::NoRows);
    }

    Ok(PriceSheet {
        current_date,
        previous_date,
        rows,
    })
}
