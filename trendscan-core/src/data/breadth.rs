//! Market breadth sources: how many instruments advanced today.
//!
//! The HTTP source reads the advancing-issue counts carried on the
//! exchange-wide composite index quotes (SSE Composite and SZSE Composite)
//! and sums them. Any failure surfaces as `DataError::BreadthUnavailable`,
//! which the market gate treats as "unknown", never as fatal.

use super::provider::DataError;
use serde_json::Value;
use std::time::Duration;

/// `{market}.{index}` pairs whose quotes carry exchange-wide up/down counts.
const COMPOSITE_SECIDS: &str = "1.000001,0.399106";
const QUOTE_ENDPOINT: &str = "https://push2.eastmoney.com/api/qt/ulist.np/get";
/// Advancing-issue count field on index quotes.
const ADVANCING_FIELD: &str = "f104";

pub trait BreadthSource {
    /// Count of advancing instruments for the current session.
    fn advancing(&self) -> Result<u32, DataError>;
}

/// Breadth supplied by the operator (or a test). `None` models an outage.
#[derive(Debug, Clone, Copy)]
pub struct FixedBreadth(pub Option<u32>);

impl BreadthSource for FixedBreadth {
    fn advancing(&self) -> Result<u32, DataError> {
        self.0
            .ok_or_else(|| DataError::BreadthUnavailable("no breadth value supplied".into()))
    }
}

pub struct EastmoneyBreadth {
    client: reqwest::blocking::Client,
}

impl EastmoneyBreadth {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn quote_url() -> String {
        format!("{QUOTE_ENDPOINT}?fltt=2&secids={COMPOSITE_SECIDS}&fields=f12,f104,f105,f106")
    }
}

impl BreadthSource for EastmoneyBreadth {
    fn advancing(&self) -> Result<u32, DataError> {
        let resp = self
            .client
            .get(Self::quote_url())
            .send()
            .map_err(|e| DataError::BreadthUnavailable(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(DataError::BreadthUnavailable(format!(
                "HTTP {}",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .map_err(|e| DataError::BreadthUnavailable(format!("reading body: {e}")))?;
        parse_advancing(&body)
    }
}

/// Sum the advancing counts across every quote in the payload.
pub fn parse_advancing(body: &str) -> Result<u32, DataError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| DataError::BreadthUnavailable(format!("payload is not JSON: {e}")))?;

    let quotes = json
        .pointer("/data/diff")
        .and_then(Value::as_array)
        .filter(|arr| !arr.is_empty())
        .ok_or_else(|| DataError::BreadthUnavailable("payload has no quotes".into()))?;

    let mut total: u64 = 0;
    for quote in quotes {
        let count = quote
            .get(ADVANCING_FIELD)
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                DataError::BreadthUnavailable(format!("quote missing {ADVANCING_FIELD}: {quote}"))
            })?;
        total += count;
    }

    u32::try_from(total)
        .map_err(|_| DataError::BreadthUnavailable(format!("implausible count {total}")))
}
