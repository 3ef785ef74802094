use serde::{Deserialize, Serialize};

/// Report copy for one diagnosis type. Every string may contain `{{token}}`s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTemplate {
    #[serde(rename = "heroTitle")]
    pub hero_title: String,
    #[serde(rename = "heroSubtitle", default)]
    pub hero_subtitle: String,
    #[serde(default)]
    pub why: Vec<String>,
    #[serde(default)]
    pub rx_72h: Vec<String>,
    #[serde(default)]
    pub rx_14d: Vec<String>,
    #[serde(default)]
    pub rx_30d: Vec<String>,
    #[serde(rename = "recommendedProducts", default)]
    pub recommended_products: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialTemplate {
    pub title: String,
    #[serde(default)]
    pub lines: Vec<String>,
}

/// Static blocks rendered alongside every report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partials {
    pub financial_snapshot: PartialTemplate,
    pub paywall: PartialTemplate,
}
