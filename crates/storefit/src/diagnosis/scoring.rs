use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;

use super::answers::{coerce_number, value_text, Answers};
use super::catalog::{child_path, Catalog, Comparison, DeltaMap, Dimension, Field, QuestionKind};

pub const BASE_SCORE: i32 = 50;
pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

pub fn clamp_score(value: i32) -> i32 {
    value.clamp(MIN_SCORE, MAX_SCORE)
}

/// Which declaration produced a score adjustment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalSource {
    GroupAnswered,
    AnyAnswered,
    Answered,
    Option { value: String },
    Numeric { when: Comparison },
    Includes { value: String },
}

/// A single ordered score adjustment collected from the catalog walk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Effect {
    pub path: String,
    pub source: SignalSource,
    pub dimension: String,
    pub delta: i32,
}

/// An applied effect with the clamped value before and after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreStep {
    #[serde(flatten)]
    pub effect: Effect,
    pub before: i32,
    pub after: i32,
}

pub type ScoreTrace = Vec<ScoreStep>;

/// Per-dimension scores in catalog declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionScores {
    entries: Vec<(String, i32)>,
}

impl DimensionScores {
    pub fn baseline(dimensions: &[Dimension]) -> Self {
        Self {
            entries: dimensions
                .iter()
                .map(|dimension| (dimension.id.clone(), BASE_SCORE))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|(dimension, _)| dimension == id)
            .map(|(_, score)| *score)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.entries
            .iter()
            .map(|(dimension, score)| (dimension.as_str(), *score))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowest score; ties resolve to the earliest declared dimension.
    pub fn lowest(&self) -> Option<(&str, i32)> {
        self.iter().min_by_key(|(_, score)| *score)
    }

    /// The `count` lowest scores, ascending, ties in declaration order.
    pub fn bottom(&self, count: usize) -> Vec<(&str, i32)> {
        let mut ranked: Vec<(&str, i32)> = self.iter().collect();
        ranked.sort_by_key(|(_, score)| *score);
        ranked.truncate(count);
        ranked
    }

    /// Applies one delta and clamps immediately. Unknown dimensions are ignored.
    fn apply(&mut self, effect: &Effect) -> Option<(i32, i32)> {
        let (_, score) = self
            .entries
            .iter_mut()
            .find(|(dimension, _)| *dimension == effect.dimension)?;
        let before = *score;
        *score = clamp_score(before.saturating_add(effect.delta));
        Some((before, *score))
    }
}

impl Serialize for DimensionScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (dimension, score) in &self.entries {
            map.serialize_entry(dimension, score)?;
        }
        map.end()
    }
}

pub fn score_dimensions(catalog: &Catalog, answers: &Answers) -> DimensionScores {
    score_dimensions_traced(catalog, answers).0
}

/// Scores every dimension and records each applied step for auditing.
pub fn score_dimensions_traced(
    catalog: &Catalog,
    answers: &Answers,
) -> (DimensionScores, ScoreTrace) {
    collect_effects(catalog, answers).into_iter().fold(
        (DimensionScores::baseline(&catalog.dimensions), Vec::new()),
        |(mut scores, mut trace), effect| {
            if let Some((before, after)) = scores.apply(&effect) {
                trace.push(ScoreStep {
                    effect,
                    before,
                    after,
                });
            }
            (scores, trace)
        },
    )
}

/// Walks the catalog in form order and lists every effect the answers trigger.
pub fn collect_effects(catalog: &Catalog, answers: &Answers) -> Vec<Effect> {
    let mut effects = Vec::new();
    for question in &catalog.questions {
        walk_field(&question.field, "", answers, &mut effects);
    }
    effects
}

fn walk_field(field: &Field, parent: &str, answers: &Answers, effects: &mut Vec<Effect>) {
    let path = child_path(parent, &field.key);

    if field.kind.is_container() {
        if any_descendant_answered(field, &path, answers) {
            push_deltas(
                effects,
                &path,
                SignalSource::GroupAnswered,
                &field.scoring.on_answered,
            );
            push_deltas(
                effects,
                &path,
                SignalSource::AnyAnswered,
                &field.scoring.on_any_answered,
            );
        }
        for child in &field.fields {
            walk_field(child, &path, answers, effects);
        }
        return;
    }

    let Some(value) = answers.answered(&path) else {
        return;
    };
    let scoring = &field.scoring;

    push_deltas(effects, &path, SignalSource::Answered, &scoring.on_answered);

    if field.kind == QuestionKind::SingleSelect {
        if let Some(selected) = value_text(value) {
            if let Some(deltas) = scoring.signals_by_option.get(&selected) {
                push_deltas(
                    effects,
                    &path,
                    SignalSource::Option { value: selected },
                    deltas,
                );
            }
        }
    }

    if let Some(number) = coerce_number(value) {
        for rule in scoring.numeric_rules.iter().filter(|rule| rule.when.holds(number)) {
            push_deltas(
                effects,
                &path,
                SignalSource::Numeric { when: rule.when },
                &rule.add,
            );
        }
    }

    let selected: HashSet<String> = answers.strings(&path).into_iter().collect();
    if !selected.is_empty() {
        for signal in scoring
            .multi_select_signals
            .iter()
            .chain(scoring.signals_by_includes.iter())
            .filter(|signal| selected.contains(&signal.includes))
        {
            push_deltas(
                effects,
                &path,
                SignalSource::Includes {
                    value: signal.includes.clone(),
                },
                &signal.add,
            );
        }
    }
}

/// Looks through nested containers down to the leaves, so nested and flat
/// dotted answers agree.
fn any_descendant_answered(container: &Field, path: &str, answers: &Answers) -> bool {
    container.fields.iter().any(|child| {
        let nested = child_path(path, &child.key);
        if child.kind.is_container() {
            any_descendant_answered(child, &nested, answers)
        } else {
            answers.is_answered(&nested)
        }
    })
}

fn push_deltas(effects: &mut Vec<Effect>, path: &str, source: SignalSource, deltas: &DeltaMap) {
    for (dimension, delta) in deltas {
        effects.push(Effect {
            path: path.to_string(),
            source: source.clone(),
            dimension: dimension.clone(),
            delta: *delta,
        });
    }
}
