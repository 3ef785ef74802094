use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Questionnaire answers as submitted by the intake form.
///
/// Grouped questions arrive as nested objects and are addressed with dot
/// paths such as `"hooks.offer.offer_type"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(Map<String, Value>);

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds answers from any JSON value; non-object input yields an empty set.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Resolves a dot path through nested objects, falling back to a flat key
    /// holding the full dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first);
        for segment in segments {
            current = match current {
                Some(Value::Object(map)) => map.get(segment),
                _ => None,
            };
        }

        current.or_else(|| self.0.get(path))
    }

    /// Returns the value at `path` only when it counts as answered.
    pub fn answered(&self, path: &str) -> Option<&Value> {
        self.get(path).filter(|value| is_answered(value))
    }

    pub fn is_answered(&self, path: &str) -> bool {
        self.answered(path).is_some()
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        self.answered(path).and_then(coerce_number)
    }

    pub fn number_or_zero(&self, path: &str) -> f64 {
        self.number(path).unwrap_or(0.0)
    }

    pub fn text(&self, path: &str) -> Option<String> {
        self.answered(path).and_then(value_text)
    }

    /// Multi-select view of an answer. A bare string counts as one selection.
    pub fn strings(&self, path: &str) -> Vec<String> {
        match self.answered(path) {
            Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
            Some(value @ Value::String(_)) => value_text(value).into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Map<String, Value>> for Answers {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Shared "has a value" predicate used by every pipeline stage.
pub fn is_answered(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) => true,
        Value::Number(number) => number.as_f64().map(f64::is_finite).unwrap_or(false),
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Lenient numeric view of an answer: accepts numbers and numeric strings
/// such as `"15,000"`, `"35%"` or `"6,000,000원"`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let cleaned: String = text
                .trim()
                .trim_end_matches('%')
                .trim_end_matches('원')
                .chars()
                .filter(|ch| *ch != ',' && *ch != '_' && !ch.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };

    parsed.filter(|number| number.is_finite())
}

/// Text form used for equality tests and token rendering.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Answers {
        Answers::from_value(json!({
            "store_name": "  을지로 국수  ",
            "avg_ticket": "15,000",
            "variable_rate": "35%",
            "hooks": {
                "signature_menu": "들기름 막국수",
                "offer": { "offer_type": "gift" }
            },
            "reviews.review_count": 42,
            "channels": ["place", "instagram"],
            "empty_list": [],
            "blank": "   ",
            "nothing": null
        }))
    }

    #[test]
    fn resolves_nested_and_flat_dot_paths() {
        let answers = sample();
        assert_eq!(
            answers.text("hooks.offer.offer_type").as_deref(),
            Some("gift")
        );
        assert_eq!(answers.number("reviews.review_count"), Some(42.0));
        assert!(answers.get("hooks.offer.missing").is_none());
        assert!(answers.get("store_name.deeper").is_none());
    }

    #[test]
    fn answered_predicate_matches_every_value_shape() {
        assert!(!is_answered(&json!(null)));
        assert!(!is_answered(&json!("  ")));
        assert!(!is_answered(&json!([])));
        assert!(!is_answered(&json!({})));
        assert!(is_answered(&json!(0)));
        assert!(is_answered(&json!(false)));
        assert!(is_answered(&json!(["a"])));
        assert!(is_answered(&json!({ "a": 1 })));

        let answers = sample();
        assert!(answers.is_answered("store_name"));
        assert!(!answers.is_answered("blank"));
        assert!(!answers.is_answered("empty_list"));
        assert!(!answers.is_answered("nothing"));
        assert!(!answers.is_answered("unknown"));
    }

    #[test]
    fn coerces_formatted_numbers() {
        let answers = sample();
        assert_eq!(answers.number("avg_ticket"), Some(15000.0));
        assert_eq!(answers.number("variable_rate"), Some(35.0));
        assert_eq!(coerce_number(&json!("6,000,000원")), Some(6_000_000.0));
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(answers.number_or_zero("store_name"), 0.0);
    }

    #[test]
    fn strings_treats_single_value_as_one_selection() {
        let mut answers = sample();
        assert_eq!(answers.strings("channels"), vec!["place", "instagram"]);
        answers.insert("pain_points", "high_cogs");
        assert_eq!(answers.strings("pain_points"), vec!["high_cogs"]);
        assert!(answers.strings("empty_list").is_empty());
    }

    #[test]
    fn non_object_input_is_empty() {
        assert!(Answers::from_value(json!([1, 2, 3])).as_map().is_empty());
    }
}
