use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::diagnosis::metrics::MetricId;

/// Numeric comparator shared by scoring rules and type conditions.
/// `between` is inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Gte(f64),
    Lte(f64),
    Between([f64; 2]),
}

impl Comparison {
    pub fn holds(self, value: f64) -> bool {
        match self {
            Comparison::Gte(bound) => value >= bound,
            Comparison::Lte(bound) => value <= bound,
            Comparison::Between([low, high]) => value >= low && value <= high,
        }
    }
}

/// Test applied to a raw answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerTest {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Gte(f64),
    Lte(f64),
    Between([f64; 2]),
}

impl AnswerTest {
    /// Numeric form of the test, when it is one.
    pub fn comparison(&self) -> Option<Comparison> {
        match self {
            AnswerTest::Gte(bound) => Some(Comparison::Gte(*bound)),
            AnswerTest::Lte(bound) => Some(Comparison::Lte(*bound)),
            AnswerTest::Between(range) => Some(Comparison::Between(*range)),
            AnswerTest::Eq(_) | AnswerTest::Ne(_) | AnswerTest::In(_) => None,
        }
    }
}

/// One clause of a type rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Condition {
    Metric { id: MetricId, cmp: Comparison },
    Dimension { id: String, cmp: Comparison },
    Answer { key: String, test: AnswerTest },
    Includes { key: String, value: String },
    Length { key: String, cmp: Comparison },
}

/// Descending priority; stable, so equal priorities keep declaration order.
pub fn sort_by_priority(rules: &mut [TypeRule]) {
    rules.sort_by(|left, right| right.priority.cmp(&left.priority));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRule {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_all: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_any: Option<Vec<Condition>>,
}

impl TypeRule {
    pub fn all_conditions(&self) -> &[Condition] {
        self.when_all.as_deref().unwrap_or_default()
    }

    pub fn any_conditions(&self) -> &[Condition] {
        self.when_any.as_deref().unwrap_or_default()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.all_conditions()
            .iter()
            .chain(self.any_conditions().iter())
    }
}

/// Lowest-dimension fallback used when no rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fallback {
    #[serde(default)]
    pub by_dimension: BTreeMap<String, String>,
    pub default: String,
}

impl Fallback {
    pub fn type_for(&self, dimension: &str) -> &str {
        self.by_dimension
            .get(dimension)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comparison_between_is_inclusive() {
        let range = Comparison::Between([35.0, 44.0]);
        assert!(range.holds(35.0));
        assert!(range.holds(44.0));
        assert!(!range.holds(44.5));
        assert!(!range.holds(50.0));
        assert!(Comparison::Gte(45.0).holds(50.0));
        assert!(Comparison::Lte(45.0).holds(45.0));
    }

    #[test]
    fn parses_every_condition_source() {
        let raw = json!([
            { "source": "metric", "id": "gap_ratio", "cmp": { "gte": 2 } },
            { "source": "dimension", "id": "hook", "cmp": { "between": [10, 40] } },
            { "source": "answer", "key": "biz_stage", "test": { "in": ["new_90", "under_1y"] } },
            { "source": "includes", "key": "pain_points", "value": "high_cogs" },
            { "source": "length", "key": "channels", "cmp": { "lte": 2 } }
        ]);

        let conditions: Vec<Condition> = serde_json::from_value(raw).expect("conditions parse");
        assert_eq!(
            conditions[0],
            Condition::Metric {
                id: MetricId::GapRatio,
                cmp: Comparison::Gte(2.0)
            }
        );
        assert!(matches!(
            &conditions[2],
            Condition::Answer { test: AnswerTest::In(values), .. } if values.len() == 2
        ));
        assert_eq!(conditions.len(), 5);
    }

    #[test]
    fn rejects_unknown_metric_ids() {
        let raw = json!({ "source": "metric", "id": "profit_vibes", "cmp": { "gte": 1 } });
        assert!(serde_json::from_value::<Condition>(raw).is_err());
    }

    #[test]
    fn fallback_uses_default_branch_for_unmapped_dimensions() {
        let fallback = Fallback {
            by_dimension: BTreeMap::from([("hook".to_string(), "weak_hook".to_string())]),
            default: "blind_ops".to_string(),
        };
        assert_eq!(fallback.type_for("hook"), "weak_hook");
        assert_eq!(fallback.type_for("data"), "blind_ops");
    }
}
