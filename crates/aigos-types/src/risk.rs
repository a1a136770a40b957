use serde::{Deserialize, Serialize};

/// Risk tier an agent instance is classified under. Ordered from least to
/// most restrictive; `Ord` follows declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Minimal,
    Limited,
    High,
    Unacceptable,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Minimal => "minimal",
            RiskLevel::Limited => "limited",
            RiskLevel::High => "high",
            RiskLevel::Unacceptable => "unacceptable",
        }
    }
}

/// Operating mode of a running instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "SANDBOX")]
    Sandbox,
    #[serde(rename = "RESTRICTED")]
    Restricted,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Sandbox => "SANDBOX",
            Mode::Restricted => "RESTRICTED",
        }
    }
}
