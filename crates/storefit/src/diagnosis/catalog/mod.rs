//! Question, rule and template catalog interpreted by the diagnosis engine.
//!
//! The catalog is data: it is parsed once, validated, and then shared
//! read-only by every evaluation. All cross references (dimension ids in
//! scoring declarations and rules, type ids in rules and the fallback table,
//! templates per type) are checked here so evaluation never has to.

mod questions;
mod rules;
mod templates;

pub use questions::{
    child_path, ChoiceOption, DeltaMap, Field, IncludesSignal, NumericRule, Question,
    QuestionKind, Scoring,
};
pub use rules::{sort_by_priority, AnswerTest, Comparison, Condition, Fallback, TypeRule};
pub use templates::{PartialTemplate, Partials, ReportTemplate};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const BUILTIN_CATALOG: &str = include_str!("../../../assets/catalog.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog declares no dimensions")]
    NoDimensions,
    #[error("dimension '{0}' is declared more than once")]
    DuplicateDimension(String),
    #[error("type '{0}' is declared more than once")]
    DuplicateType(String),
    #[error("question key '{0}' is used more than once at the same level")]
    DuplicateQuestion(String),
    #[error("question key '{0}' must be non-empty and must not contain '.'")]
    InvalidQuestionKey(String),
    #[error("{context} references unknown dimension '{dimension}'")]
    UnknownDimension { context: String, dimension: String },
    #[error("{context} references unknown type '{type_id}'")]
    UnknownType { context: String, type_id: String },
    #[error("type '{0}' has no report template")]
    MissingTemplate(String),
    #[error("rule for type '{0}' declares neither whenAll nor whenAny conditions")]
    EmptyRule(String),
    #[error("question '{path}' declares {signal}, which never fires for its kind")]
    MisplacedSignal { path: String, signal: &'static str },
}

/// Validated, immutable catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub dimensions: Vec<Dimension>,
    pub types: Vec<TypeDef>,
    pub questions: Vec<Question>,
    pub rules: Vec<TypeRule>,
    pub fallback: Fallback,
    pub templates: BTreeMap<String, ReportTemplate>,
    pub partials: Partials,
}

impl Catalog {
    /// Catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(raw)?;
        catalog.validated()
    }

    /// Checks every cross reference, puts questions into form order and rules
    /// into evaluation order.
    pub fn validated(mut self) -> Result<Self, CatalogError> {
        self.questions.sort_by_key(|question| question.order);
        sort_by_priority(&mut self.rules);
        self.validate()?;
        debug!(
            dimensions = self.dimensions.len(),
            questions = self.questions.len(),
            rules = self.rules.len(),
            "diagnosis catalog validated"
        );
        Ok(self)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.dimensions.is_empty() {
            return Err(CatalogError::NoDimensions);
        }

        let mut dimension_ids = HashSet::new();
        for dimension in &self.dimensions {
            if !dimension_ids.insert(dimension.id.as_str()) {
                return Err(CatalogError::DuplicateDimension(dimension.id.clone()));
            }
        }

        let mut type_ids = HashSet::new();
        for type_def in &self.types {
            if !type_ids.insert(type_def.id.as_str()) {
                return Err(CatalogError::DuplicateType(type_def.id.clone()));
            }
            if !self.templates.contains_key(&type_def.id) {
                return Err(CatalogError::MissingTemplate(type_def.id.clone()));
            }
        }

        let check_dimension = |context: &str, dimension: &str| {
            if dimension_ids.contains(dimension) {
                Ok(())
            } else {
                Err(CatalogError::UnknownDimension {
                    context: context.to_string(),
                    dimension: dimension.to_string(),
                })
            }
        };
        let check_type = |context: &str, type_id: &str| {
            if type_ids.contains(type_id) {
                Ok(())
            } else {
                Err(CatalogError::UnknownType {
                    context: context.to_string(),
                    type_id: type_id.to_string(),
                })
            }
        };

        let top_level: Vec<&Field> = self.questions.iter().map(|q| &q.field).collect();
        validate_fields(&top_level, "", &check_dimension)?;

        for rule in &self.rules {
            let context = format!("rule for '{}'", rule.type_id);
            check_type(&context, &rule.type_id)?;
            if rule.all_conditions().is_empty() && rule.any_conditions().is_empty() {
                return Err(CatalogError::EmptyRule(rule.type_id.clone()));
            }
            for condition in rule.conditions() {
                if let Condition::Dimension { id, .. } = condition {
                    check_dimension(&context, id)?;
                }
            }
        }

        for (dimension, type_id) in &self.fallback.by_dimension {
            check_dimension("fallback table", dimension)?;
            check_type("fallback table", type_id)?;
        }
        check_type("fallback default", &self.fallback.default)?;

        Ok(())
    }

    pub fn dimension_label(&self, id: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|dimension| dimension.id == id)
            .map(|dimension| dimension.label.as_str())
    }

    pub fn type_label(&self, id: &str) -> Option<&str> {
        self.types
            .iter()
            .find(|type_def| type_def.id == id)
            .map(|type_def| type_def.label.as_str())
    }

    pub fn template(&self, type_id: &str) -> Option<&ReportTemplate> {
        self.templates.get(type_id)
    }

    pub fn question(&self, key: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.key() == key)
    }
}

fn validate_fields<F>(
    fields: &[&Field],
    parent: &str,
    check_dimension: &F,
) -> Result<(), CatalogError>
where
    F: Fn(&str, &str) -> Result<(), CatalogError>,
{
    let mut keys = HashSet::new();
    for field in fields {
        let path = child_path(parent, &field.key);
        if field.key.is_empty() || field.key.contains('.') {
            return Err(CatalogError::InvalidQuestionKey(path));
        }
        if !keys.insert(field.key.as_str()) {
            return Err(CatalogError::DuplicateQuestion(path));
        }

        if let Some(signal) = misplaced_signal(field) {
            return Err(CatalogError::MisplacedSignal { path, signal });
        }

        let context = format!("question '{path}'");
        for dimension in field.scoring.dimensions() {
            check_dimension(&context, dimension)?;
        }

        let nested: Vec<&Field> = field.fields.iter().collect();
        validate_fields(&nested, &path, check_dimension)?;
    }
    Ok(())
}

/// Containers only react to answered descendants; leaves have no siblings
/// to watch, and option signals need a single-select.
fn misplaced_signal(field: &Field) -> Option<&'static str> {
    let scoring = &field.scoring;
    if field.kind.is_container() {
        if !scoring.signals_by_option.is_empty() {
            return Some("signalsByOption");
        }
        if !scoring.numeric_rules.is_empty() {
            return Some("numericRules");
        }
        if !scoring.multi_select_signals.is_empty() {
            return Some("multiSelectSignals");
        }
        if !scoring.signals_by_includes.is_empty() {
            return Some("signalsByIncludes");
        }
        return None;
    }

    if !scoring.on_any_answered.is_empty() {
        return Some("onAnyAnswered");
    }
    if field.kind != QuestionKind::SingleSelect && !scoring.signals_by_option.is_empty() {
        return Some("signalsByOption");
    }
    None
}
