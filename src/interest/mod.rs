pub mod accrual;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use accrual::{AccrualEngine, ActiveWindow, InterestBreakdown};

/// how gross interest is persisted and displayed
///
/// retention and net are always rounded to cents regardless
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrossReporting {
    /// rounded to two decimals, half away from zero
    #[default]
    Rounded,
    /// internal precision
    Full,
}

impl FromStr for GrossReporting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rounded" => Ok(GrossReporting::Rounded),
            "full" => Ok(GrossReporting::Full),
            other => Err(format!("unknown gross reporting mode: {other}")),
        }
    }
}
