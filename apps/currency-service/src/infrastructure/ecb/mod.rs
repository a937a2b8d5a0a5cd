//! ECB Reference Rate Feed
//!
//! Fetches the ECB euro foreign exchange reference rates: one HTTP GET of an
//! XML document of historical daily rate "cubes", of which only the most
//! recent day's entries are consumed.
//!
//! Document shape (namespaces elided):
//!
//! ```xml
//! <Envelope>
//!   <Cube>
//!     <Cube time="2026-08-27">
//!       <Cube currency="USD" rate="1.1652"/>
//!       ...
//!     </Cube>
//!     ...
//!   </Cube>
//! </Envelope>
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::ports::{FeedError, RateProvider};
use crate::domain::currency::Currency;

/// Default ECB historical reference rate feed (last 90 days).
pub const DEFAULT_FEED_URL: &str =
    "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-hist-90d.xml";

/// Default timeout for one feed retrieval.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// XML Document Model
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Cube")]
    cube: OuterCube,
}

#[derive(Debug, Deserialize)]
struct OuterCube {
    #[serde(rename = "Cube", default)]
    days: Vec<DailyCube>,
}

#[derive(Debug, Deserialize)]
struct DailyCube {
    #[serde(rename = "@time")]
    time: String,
    #[serde(rename = "Cube", default)]
    rates: Vec<RateCube>,
}

#[derive(Debug, Deserialize)]
struct RateCube {
    #[serde(rename = "@currency")]
    currency: String,
    #[serde(rename = "@rate")]
    rate: String,
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse an ECB cube document into a flat currency-to-rate mapping.
///
/// Only the most recent daily cube is consumed. Currency codes outside the
/// service's fixed set are skipped; a malformed numeric rate fails the whole
/// parse.
///
/// # Errors
///
/// Returns `FeedError::Parse` on malformed XML, a document with no daily
/// cubes, or an unparseable rate value.
pub fn parse_cube_document(xml: &str) -> Result<HashMap<Currency, f64>, FeedError> {
    let envelope: Envelope =
        quick_xml::de::from_str(xml).map_err(|e| FeedError::Parse(e.to_string()))?;

    // The historical feed lists newest first, but pick by date to be safe.
    let latest = envelope
        .cube
        .days
        .iter()
        .max_by(|a, b| a.time.cmp(&b.time))
        .ok_or_else(|| FeedError::Parse("document contains no rate cubes".to_string()))?;

    let mut rates = HashMap::with_capacity(latest.rates.len());
    for entry in &latest.rates {
        let Ok(currency) = entry.currency.parse::<Currency>() else {
            tracing::debug!(currency = %entry.currency, "Skipping unrecognized feed currency");
            continue;
        };

        let rate: f64 = entry.rate.parse().map_err(|_| {
            FeedError::Parse(format!(
                "malformed rate {:?} for currency {}",
                entry.rate, currency
            ))
        })?;

        rates.insert(currency, rate);
    }

    Ok(rates)
}

// =============================================================================
// HTTP Client
// =============================================================================

/// HTTP adapter for the ECB reference rate feed.
#[derive(Debug, Clone)]
pub struct EcbRateFeed {
    client: reqwest::Client,
    url: String,
}

impl EcbRateFeed {
    /// Create a feed client for `url`.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Unavailable` if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Create a feed client against the default ECB URL.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Unavailable` if the HTTP client cannot be built.
    pub fn with_defaults() -> Result<Self, FeedError> {
        Self::new(DEFAULT_FEED_URL, DEFAULT_FETCH_TIMEOUT)
    }

    /// The feed URL this client targets.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RateProvider for EcbRateFeed {
    async fn fetch(&self) -> Result<HashMap<Currency, f64>, FeedError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FeedError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Unavailable(e.to_string()))?;

        parse_cube_document(&body)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01"
    xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
    <gesmes:subject>Reference rates</gesmes:subject>
    <gesmes:Sender>
        <gesmes:name>European Central Bank</gesmes:name>
    </gesmes:Sender>
    <Cube>
        <Cube time="2026-08-27">
            <Cube currency="USD" rate="1.1652"/>
            <Cube currency="GBP" rate="0.8598"/>
            <Cube currency="JPY" rate="171.23"/>
        </Cube>
        <Cube time="2026-08-26">
            <Cube currency="USD" rate="1.1701"/>
            <Cube currency="GBP" rate="0.8610"/>
        </Cube>
    </Cube>
</gesmes:Envelope>"#;

    #[test]
    fn parses_most_recent_cube_only() {
        let rates = parse_cube_document(SAMPLE).unwrap();
        assert_eq!(rates.len(), 3);
        assert!((rates[&Currency::Usd] - 1.1652).abs() < 1e-12);
        assert!((rates[&Currency::Gbp] - 0.8598).abs() < 1e-12);
        assert!((rates[&Currency::Jpy] - 171.23).abs() < 1e-12);
    }

    #[test]
    fn skips_unrecognized_currency_codes() {
        let xml = r#"<Envelope><Cube><Cube time="2026-08-27">
            <Cube currency="USD" rate="1.1652"/>
            <Cube currency="XYZ" rate="2.5"/>
        </Cube></Cube></Envelope>"#;
        let rates = parse_cube_document(xml).unwrap();
        assert_eq!(rates.len(), 1);
        assert!(rates.contains_key(&Currency::Usd));
    }

    #[test]
    fn malformed_rate_is_a_parse_error() {
        let xml = r#"<Envelope><Cube><Cube time="2026-08-27">
            <Cube currency="USD" rate="not-a-number"/>
        </Cube></Cube></Envelope>"#;
        let err = parse_cube_document(xml).unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = parse_cube_document("<Envelope><unclosed>").unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn empty_document_is_a_parse_error() {
        let err = parse_cube_document("<Envelope><Cube></Cube></Envelope>").unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn picks_latest_day_regardless_of_order() {
        let xml = r#"<Envelope><Cube>
            <Cube time="2026-08-25"><Cube currency="USD" rate="1.0"/></Cube>
            <Cube time="2026-08-27"><Cube currency="USD" rate="1.2"/></Cube>
            <Cube time="2026-08-26"><Cube currency="USD" rate="1.1"/></Cube>
        </Cube></Envelope>"#;
        let rates = parse_cube_document(xml).unwrap();
        assert!((rates[&Currency::Usd] - 1.2).abs() < 1e-12);
    }
}
