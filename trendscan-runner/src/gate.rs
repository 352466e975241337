//! MarketGate: go/no-go on market breadth before a scan.

use serde::{Deserialize, Serialize};
use trendscan_core::data::BreadthSource;

use crate::config::GateConfig;

/// What to do when the breadth figure cannot be obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailablePolicy {
    #[default]
    Pass,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Breadth at or above the threshold.
    Proceed { advancing: u32 },
    /// Breadth below the threshold; the scan is a deliberate no-op.
    Skip { advancing: u32, threshold: u32 },
    /// Breadth unavailable, let through by policy.
    ProceedUnverified,
    /// Breadth unavailable, held back by policy.
    BlockedUnverified,
    /// Gate switched off in config.
    Disabled,
}

impl GateDecision {
    pub fn proceeds(&self) -> bool {
        matches!(
            self,
            GateDecision::Proceed { .. } | GateDecision::ProceedUnverified | GateDecision::Disabled
        )
    }
}

#[derive(Debug, Clone)]
pub struct MarketGate {
    config: GateConfig,
}

impl MarketGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Consult `source` once and decide. The source is not queried when the
    /// gate is disabled.
    pub fn evaluate(&self, source: &dyn BreadthSource) -> GateDecision {
        if !self.config.enabled {
            tracing::info!("market gate disabled");
            return GateDecision::Disabled;
        }

        let threshold = self.config.min_advancing;
        match source.advancing() {
            Ok(advancing) if advancing < threshold => {
                tracing::info!(advancing, threshold, "breadth below threshold, scan skipped");
                GateDecision::Skip {
                    advancing,
                    threshold,
                }
            }
            Ok(advancing) => {
                tracing::info!(advancing, threshold, "breadth ok, scan proceeds");
                GateDecision::Proceed { advancing }
            }
            Err(e) => match self.config.on_unavailable {
                UnavailablePolicy::Pass => {
                    tracing::warn!(error = %e, "breadth unavailable, proceeding without gate");
                    GateDecision::ProceedUnverified
                }
                UnavailablePolicy::Block => {
                    tracing::warn!(error = %e, "breadth unavailable, scan blocked");
                    GateDecision::BlockedUnverified
                }
            },
        }
    }
}
