use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use tracing::debug;

use super::answers::{coerce_number, value_text, Answers};
use super::catalog::{sort_by_priority, AnswerTest, Condition, Fallback, TypeRule};
use super::metrics::Metrics;
use super::scoring::DimensionScores;

/// How the winning type was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum MatchSource {
    /// `index` is the rule's position in evaluation order.
    Rule { priority: i32, index: usize },
    Fallback { dimension: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub type_id: String,
    pub source: MatchSource,
}

/// Everything a condition can be evaluated against.
pub struct ClassifierInput<'a> {
    pub answers: &'a Answers,
    pub metrics: &'a Metrics,
    pub dimensions: &'a DimensionScores,
}

/// Returns the type of the highest-priority matching rule, or the lowest
/// dimension's fallback type when nothing matches.
pub fn pick_type(
    answers: &Answers,
    metrics: &Metrics,
    dimensions: &DimensionScores,
    rules: &[TypeRule],
    fallback: &Fallback,
) -> Classification {
    let input = ClassifierInput {
        answers,
        metrics,
        dimensions,
    };

    let ordered = in_priority_order(rules);
    if let Some((index, rule)) = ordered
        .iter()
        .enumerate()
        .find(|(_, rule)| rule_matches(rule, &input))
    {
        debug!(type_id = %rule.type_id, priority = rule.priority, "type rule matched");
        return Classification {
            type_id: rule.type_id.clone(),
            source: MatchSource::Rule {
                priority: rule.priority,
                index,
            },
        };
    }

    let dimension = dimensions
        .lowest()
        .map(|(dimension, _)| dimension.to_string())
        .unwrap_or_default();
    let type_id = fallback.type_for(&dimension).to_string();
    debug!(%type_id, %dimension, "no type rule matched, using weakest dimension");

    Classification {
        type_id,
        source: MatchSource::Fallback { dimension },
    }
}

/// Validated catalogs already hold rules by descending priority; anything
/// else gets a stable sort so equal priorities keep declaration order.
fn in_priority_order(rules: &[TypeRule]) -> Cow<'_, [TypeRule]> {
    if rules
        .windows(2)
        .all(|pair| pair[0].priority >= pair[1].priority)
    {
        return Cow::Borrowed(rules);
    }
    let mut sorted = rules.to_vec();
    sort_by_priority(&mut sorted);
    Cow::Owned(sorted)
}

/// `whenAll` alone needs every condition, `whenAny` alone needs one, and a
/// rule carrying both needs the any-group and the all-group to pass.
pub fn rule_matches(rule: &TypeRule, input: &ClassifierInput<'_>) -> bool {
    let all = rule.all_conditions();
    let any = rule.any_conditions();

    match (all.is_empty(), any.is_empty()) {
        (true, true) => false,
        (false, true) => all.iter().all(|condition| condition_holds(condition, input)),
        (true, false) => any.iter().any(|condition| condition_holds(condition, input)),
        (false, false) => {
            any.iter().any(|condition| condition_holds(condition, input))
                && all.iter().all(|condition| condition_holds(condition, input))
        }
    }
}

pub fn condition_holds(condition: &Condition, input: &ClassifierInput<'_>) -> bool {
    match condition {
        Condition::Metric { id, cmp } => cmp.holds(input.metrics.get(*id)),
        Condition::Dimension { id, cmp } => input
            .dimensions
            .get(id)
            .map(|score| cmp.holds(f64::from(score)))
            .unwrap_or(false),
        Condition::Answer { key, test } => answer_test_holds(input.answers.answered(key), test),
        Condition::Includes { key, value } => input
            .answers
            .strings(key)
            .iter()
            .any(|selected| selected == value),
        Condition::Length { key, cmp } => {
            let count = match input.answers.answered(key) {
                Some(Value::Array(items)) => items.len(),
                Some(_) => 1,
                None => 0,
            };
            cmp.holds(count as f64)
        }
    }
}

fn answer_test_holds(answer: Option<&Value>, test: &AnswerTest) -> bool {
    match test {
        AnswerTest::Eq(expected) => answer.is_some_and(|value| loosely_equal(value, expected)),
        AnswerTest::Ne(expected) => !answer.is_some_and(|value| loosely_equal(value, expected)),
        AnswerTest::In(candidates) => answer.is_some_and(|value| {
            candidates
                .iter()
                .any(|candidate| loosely_equal(value, candidate))
        }),
        AnswerTest::Gte(_) | AnswerTest::Lte(_) | AnswerTest::Between(_) => {
            let Some(cmp) = test.comparison() else {
                return false;
            };
            answer
                .and_then(coerce_number)
                .map(|number| cmp.holds(number))
                .unwrap_or(false)
        }
    }
}

/// Numbers compare numerically when both sides coerce; otherwise trimmed text.
fn loosely_equal(answer: &Value, expected: &Value) -> bool {
    if let (Some(left), Some(right)) = (coerce_number(answer), coerce_number(expected)) {
        return left == right;
    }
    match (value_text(answer), value_text(expected)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}
