use serde::{Deserialize, Serialize};

/// Exchange an A-share code trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    Shanghai,
    Shenzhen,
}

impl Market {
    /// Shanghai codes start with `6`; everything else is routed to Shenzhen.
    pub fn of(code: &str) -> Self {
        if code.starts_with('6') {
            Market::Shanghai
        } else {
            Market::Shenzhen
        }
    }

    /// Market id used in vendor `secid` parameters (`1.600000`, `0.000001`).
    pub fn vendor_id(&self) -> u8 {
        match self {
            Market::Shanghai => 1,
            Market::Shenzhen => 0,
        }
    }

    /// Exchange suffix (`SH` / `SZ`).
    pub fn suffix(&self) -> &'static str {
        match self {
            Market::Shanghai => "SH",
            Market::Shenzhen => "SZ",
        }
    }
}

/// Left-pad a numeric code to six digits (`1` → `000001`).
///
/// Spreadsheet round-trips strip leading zeros, so every code entering the
/// system passes through here.
pub fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() < 6 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        format!("{trimmed:0>6}")
    } else {
        trimmed.to_string()
    }
}

/// A tracked security: code plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub code: String,
    pub name: String,
}

impl Instrument {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: normalize_code(code),
            name: name.trim().to_string(),
        }
    }

    pub fn market(&self) -> Market {
        Market::of(&self.code)
    }
}
