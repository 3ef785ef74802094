use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::rules::Comparison;

/// Signed score adjustments keyed by dimension id.
pub type DeltaMap = BTreeMap<String, i32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    Url,
    Text,
    SingleSelect,
    MultiSelect,
    Currency,
    Percent,
    Number,
    File,
    Group,
    Subgroup,
}

impl QuestionKind {
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Group | Self::Subgroup)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Url => "URL",
            Self::Text => "Text",
            Self::SingleSelect => "Single Select",
            Self::MultiSelect => "Multi Select",
            Self::Currency => "Currency",
            Self::Percent => "Percent",
            Self::Number => "Number",
            Self::File => "File",
            Self::Group => "Group",
            Self::Subgroup => "Subgroup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

/// Score-effect declarations attached to a question or field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scoring {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub on_answered: DeltaMap,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub on_any_answered: DeltaMap,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub signals_by_option: BTreeMap<String, DeltaMap>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub numeric_rules: Vec<NumericRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub multi_select_signals: Vec<IncludesSignal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signals_by_includes: Vec<IncludesSignal>,
}

impl Scoring {
    /// Every dimension id this declaration touches, for catalog validation.
    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.on_answered
            .keys()
            .chain(self.on_any_answered.keys())
            .chain(self.signals_by_option.values().flat_map(|map| map.keys()))
            .chain(self.numeric_rules.iter().flat_map(|rule| rule.add.keys()))
            .chain(
                self.multi_select_signals
                    .iter()
                    .chain(self.signals_by_includes.iter())
                    .flat_map(|signal| signal.add.keys()),
            )
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericRule {
    pub when: Comparison,
    pub add: DeltaMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludesSignal {
    pub includes: String,
    pub add: DeltaMap,
}

/// A survey item. Groups and subgroups carry nested fields instead of a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    #[serde(default)]
    pub label: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub scoring: Scoring,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

impl Field {
    pub fn option_label(&self, value: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.value == value)
            .map(|option| option.label.as_str())
    }
}

/// Top-level questionnaire entry: a field plus its position in the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub order: u32,
    #[serde(default)]
    pub section: String,
    #[serde(flatten)]
    pub field: Field,
}

impl Question {
    pub fn key(&self) -> &str {
        &self.field.key
    }
}

/// Joins a parent path and a field key into the dot path used by `Answers`.
pub fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
