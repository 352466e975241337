//! Eastmoney daily kline provider.
//!
//! Fetches unadjusted daily bars from the `push2his` kline endpoint. Handles
//! retries with exponential backoff, the circuit breaker, and the strict parse
//! from kline strings into `PriceBar`s.
//!
//! Each kline is a comma-joined string:
//! `date,open,close,high,low,volume,amount,...`. Note close comes before high.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, PriceProvider};
use super::store::parse_date;
use crate::domain::{Market, PriceBar, PriceSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const KLINE_ENDPOINT: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const KLINE_FIELDS1: &str = "f1%2Cf2%2Cf3%2Cf4%2Cf5%2Cf6";
const KLINE_FIELDS2: &str =
    "f51%2Cf52%2Cf53%2Cf54%2Cf55%2Cf56%2Cf57%2Cf58%2Cf59%2Cf60%2Cf61%2Cf116";
const KLINE_UT: &str = "7eea3edcaed734bea9cbfc24409ed989";
/// Open-ended upper bound accepted by the endpoint.
const KLINE_END: &str = "20500101";

/// Kline API response envelope.
#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Option<Vec<String>>,
}

/// Parse a raw kline JSON payload (as returned by the endpoint or saved by hand).
///
/// A payload without `data.klines` is an empty series. Lines with fewer than
/// six fields are dropped. Any other malformed field rejects the payload.
pub fn parse_kline_payload(code: &str, body: &str) -> Result<PriceSeries, DataError> {
    let resp: KlineResponse = serde_json::from_str(body).map_err(|e| {
        DataError::ResponseFormatChanged(format!("kline payload for {code} is not JSON: {e}"))
    })?;

    let lines = match resp.data.and_then(|d| d.klines) {
        Some(lines) => lines,
        None => return Ok(PriceSeries::empty()),
    };

    parse_klines(code, &lines)
}

/// Parse kline strings into a normalized series.
pub fn parse_klines(code: &str, lines: &[String]) -> Result<PriceSeries, DataError> {
    let mut bars = Vec::with_capacity(lines.len());

    for line in lines {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 6 {
            continue;
        }

        let date = parse_date(parts[0]).ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("{code}: bad kline date '{}'", parts[0]))
        })?;
        let num = |idx: usize, field: &str| -> Result<f64, DataError> {
            parts[idx].trim().parse::<f64>().map_err(|_| {
                DataError::ResponseFormatChanged(format!(
                    "{code}: bad {field} '{}' on {date}",
                    parts[idx]
                ))
            })
        };

        let bar = PriceBar {
            date,
            open: num(1, "open")?,
            close: num(2, "close")?,
            high: num(3, "high")?,
            low: num(4, "low")?,
            volume: num(5, "volume")?,
        };
        if bar.is_void() {
            return Err(DataError::ResponseFormatChanged(format!(
                "{code}: invalid values on {date}"
            )));
        }
        bars.push(bar);
    }

    Ok(PriceSeries::from_bars(bars))
}

/// Eastmoney kline provider.
pub struct EastmoneyProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl EastmoneyProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Build the kline URL for a code and start date.
    pub fn kline_url(code: &str, start: NaiveDate) -> String {
        let market = Market::of(code).vendor_id();
        format!(
            "{KLINE_ENDPOINT}?fields1={KLINE_FIELDS1}&fields2={KLINE_FIELDS2}\
             &ut={KLINE_UT}&klt=101&fqt=0&secid={market}.{code}\
             &beg={beg}&end={KLINE_END}",
            beg = start.format("%Y%m%d"),
        )
    }

    fn fetch_with_retry(&self, code: &str, start: NaiveDate) -> Result<PriceSeries, DataError> {
        let url = Self::kline_url(code, start);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(code, attempt, delay_ms = delay.as_millis() as u64, "retrying kline fetch");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SymbolNotFound {
                    code: code.to_string(),
                });
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {code}")));
                continue;
            }

            let body = resp
                .text()
                .map_err(|e| DataError::NetworkUnreachable(format!("reading body for {code}: {e}")))?;
            let series = parse_kline_payload(code, &body)?;
            self.circuit_breaker.record_success();
            return Ok(series);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl PriceProvider for EastmoneyProvider {
    fn name(&self) -> &str {
        "eastmoney"
    }

    fn fetch(&self, code: &str, start: NaiveDate) -> Result<PriceSeries, DataError> {
        self.fetch_with_retry(code, start)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn url_routes_by_market() {
        let sh = EastmoneyProvider::kline_url("600519", d(2018, 1, 1));
        assert!(sh.contains("secid=1.600519"));
        assert!(sh.contains("beg=20180101"));
        assert!(sh.contains("klt=101"));

        let sz = EastmoneyProvider::kline_url("000001", d(2024, 3, 15));
        assert!(sz.contains("secid=0.000001"));
        assert!(sz.contains("beg=20240315"));
    }

    #[test]
    fn parses_kline_field_order() {
        let body = r#"{"rc":0,"data":{"code":"000001","klines":[
            "2024-01-02,9.39,9.21,9.42,9.21,1158366,1075742252.45,2.34,-1.71,-0.16,0.60",
            "2024-01-03,9.19,9.20,9.22,9.15,733610,673673613.00,0.76,-0.11,-0.01,0.38"
        ]}}"#;

        let series = parse_kline_payload("000001", body).unwrap();
        assert_eq!(series.len(), 2);
        let first = &series.bars()[0];
        assert_eq!(first.date, d(2024, 1, 2));
        assert_eq!(first.open, 9.39);
        assert_eq!(first.close, 9.21);
        assert_eq!(first.high, 9.42);
        assert_eq!(first.low, 9.21);
        assert_eq!(first.volume, 1_158_366.0);
    }

    #[test]
    fn missing_klines_is_empty() {
        let series = parse_kline_payload("000001", r#"{"rc":0,"data":null}"#).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn short_lines_are_dropped() {
        let body = r#"{"data":{"klines":["2024-01-02,9.39,9.21","2024-01-03,9.19,9.20,9.22,9.15,733610"]}}"#;
        let series = parse_kline_payload("000001", body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.first_date(), Some(d(2024, 1, 3)));
    }

    #[test]
    fn malformed_number_is_parse_failure() {
        let body = r#"{"data":{"klines":["2024-01-02,9.39,-,9.42,9.21,100"]}}"#;
        let err = parse_kline_payload("000001", body).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn non_json_is_parse_failure() {
        let err = parse_kline_payload("000001", "<html>blocked</html>").unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }
}
