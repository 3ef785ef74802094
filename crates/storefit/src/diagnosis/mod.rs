//! Questionnaire diagnosis: metrics, dimension scores, type selection and
//! the rendered report, composed by [`DiagnosisEngine::evaluate`].

pub mod answers;
pub mod catalog;
pub mod classifier;
pub mod metrics;
pub mod render;
pub mod router;
pub mod scoring;

pub use answers::Answers;
pub use catalog::{Catalog, CatalogError};
pub use classifier::{Classification, MatchSource};
pub use metrics::{MetricId, Metrics};
pub use render::{RenderedPartial, RenderedPartials, RenderedReport, SecondaryIssue};
pub use router::diagnosis_router;
pub use scoring::{DimensionScores, ScoreStep, ScoreTrace};

use serde::Serialize;
use tracing::debug;

/// Stateless evaluator over a validated catalog. Safe to share across threads.
#[derive(Debug, Clone)]
pub struct DiagnosisEngine {
    catalog: Catalog,
}

impl DiagnosisEngine {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Catalog::builtin().map(Self::new)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn evaluate(&self, answers: &Answers) -> Diagnosis {
        self.explain(answers).diagnosis
    }

    /// Evaluates and keeps the score steps and classification source.
    pub fn explain(&self, answers: &Answers) -> DiagnosisTrace {
        let catalog = &self.catalog;
        let metrics = metrics::compute_metrics(answers);
        let (dimensions, steps) = scoring::score_dimensions_traced(catalog, answers);
        let classification = classifier::pick_type(
            answers,
            &metrics,
            &dimensions,
            &catalog.rules,
            &catalog.fallback,
        );
        let rendering = render::render(
            catalog,
            &classification.type_id,
            answers,
            &metrics,
            &dimensions,
        );

        debug!(
            type_id = %classification.type_id,
            applied_signals = steps.len(),
            "diagnosis evaluated"
        );

        let diagnosis_type = TypeSummary {
            label: catalog
                .type_label(&classification.type_id)
                .unwrap_or(&classification.type_id)
                .to_string(),
            id: classification.type_id.clone(),
        };

        DiagnosisTrace {
            diagnosis: Diagnosis {
                metrics,
                dimensions,
                diagnosis_type,
                secondary_issues: rendering.secondary_issues,
                report: rendering.report,
                partials: rendering.partials,
            },
            classification,
            steps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSummary {
    pub id: String,
    pub label: String,
}

/// Complete evaluation result handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub metrics: Metrics,
    pub dimensions: DimensionScores,
    #[serde(rename = "type")]
    pub diagnosis_type: TypeSummary,
    pub secondary_issues: Vec<SecondaryIssue>,
    pub report: RenderedReport,
    pub partials: RenderedPartials,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisTrace {
    pub diagnosis: Diagnosis,
    pub classification: Classification,
    pub steps: ScoreTrace,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> DiagnosisEngine {
        DiagnosisEngine::builtin().expect("builtin engine")
    }

    #[test]
    fn evaluation_is_deterministic() {
        let engine = engine();
        let answers = Answers::from_value(json!({
            "store_name": "성수 카페",
            "avg_ticket": 9000,
            "fixed_cost": 4500000,
            "variable_rate": 38,
            "monthly_teams": 1200,
            "channels": ["instagram"],
            "pain_points": ["no_repeat", "high_cogs"]
        }));

        let first = serde_json::to_string(&engine.evaluate(&answers)).expect("serializes");
        let second = serde_json::to_string(&engine.evaluate(&answers)).expect("serializes");
        assert_eq!(first, second);
    }

    #[test]
    fn serialized_shape_uses_presentation_keys() {
        let diagnosis = engine().evaluate(&Answers::new());
        let value = serde_json::to_value(&diagnosis).expect("serializes");

        assert_eq!(value["type"]["id"], "weak_hook");
        assert_eq!(value["type"]["label"], "후킹 부재형");
        assert_eq!(value["secondaryIssues"].as_array().map(Vec::len), Some(3));
        assert!(value["report"]["heroTitle"].is_string());
        assert!(value["report"]["rx_72h"].is_array());
        assert!(value["report"]["recommendedProducts"].is_array());
        assert!(value["partials"]["financialSnapshot"]["lines"].is_array());
        assert!(value["partials"]["paywall"]["title"].is_string());
        assert_eq!(value["metrics"]["gap_ratio"], 0.0);
        assert_eq!(value["dimensions"].as_object().map(|map| map.len()), Some(8));
    }

    #[test]
    fn explain_matches_evaluate() {
        let engine = engine();
        let answers = Answers::from_value(json!({ "repeat_rate": 10 }));
        let trace = engine.explain(&answers);
        assert_eq!(trace.diagnosis, engine.evaluate(&answers));
        assert_eq!(trace.classification.type_id, "one_and_done");
        assert_eq!(trace.steps.len(), 1);
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DiagnosisEngine>();
    }
}
