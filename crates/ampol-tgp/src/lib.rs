mod parser;
pub mod pdf;
pub mod pipeline;
pub mod scraper;
pub mod settings;
pub mod store;
pub mod types;
pub mod utils;

pub use parser::{ParseError, parse_price_sheet, parse_pricing_page};
pub use pipeline::{Pipeline, PipelineError};
pub use scraper::{ScraperError, WebScraper};
pub use settings::Settings;

pub(crate) const PRICING_PAGE_URL: &str = "https://www.ampol.com.au/business/pricing";
