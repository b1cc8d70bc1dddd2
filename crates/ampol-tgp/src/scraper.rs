use crate::parser::{ParseError, parse_price_sheet, parse_pricing_page};
use crate::pdf::{PdfError, first_page_text};
use crate::settings::ScrapeSettings;
use crate::store::{StoreError, append_records};
use crate::types::{PriceSheet, TgpRecord};

use chrono::{SubsecRound, Utc};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("PDF error: {0}")]
    PdfError(#[from] PdfError),
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    page_url: String,
}

impl WebScraper {
    pub fn new(settings: &ScrapeSettings) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            page_url: settings.page_url.clone(),
        })
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub async fn fetch_pdf_url(&self) -> Result<String, ScraperError> {
        log::info!("Fetching page: {}", self.page_url);
        let html = self
            .client
            .get(&self.page_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let pdf_url = parse_pricing_page(&html, &self.page_url)?;
        log::info!("Found PDF URL: {}", pdf_url);
        Ok(pdf_url)
    }

    pub async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        log::info!("Downloading PDF...");
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        log::debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    pub async fn fetch_price_sheet(&self) -> Result<PriceSheet, ScraperError> {
        let pdf_url = self.fetch_pdf_url().await?;
        let pdf = self.fetch_pdf(&pdf_url).await?;

        log::info!("Extracting data from PDF via text parsing...");
        let text = first_page_text(&pdf)?;
        Ok(parse_price_sheet(&text)?)
    }

    pub async fn scrape_into(&self, output: &Path) -> Result<Vec<TgpRecord>, ScraperError> {
        let sheet = self.fetch_price_sheet().await?;

        log::info!("Processing data...");
        let downloaded_at = Utc::now().naive_utc().trunc_subsecs(0);
        let records = sheet.to_records(downloaded_at);
        log::info!(
            "Parsed {} prices across {} terminals",
            records.len(),
            sheet.rows.len()
        );

        let total = append_records(output, records.clone())?;
        log::debug!("{} now holds {} records", output.display(), total);
        Ok(records)
    }
}
