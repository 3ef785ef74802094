use serde::Serialize;
use std::collections::BTreeMap;

use super::answers::{coerce_number, value_text, Answers};
use super::catalog::{child_path, Catalog, Field, PartialTemplate, QuestionKind, ReportTemplate};
use super::metrics::{MetricId, Metrics};
use super::scoring::DimensionScores;

/// Rendered in place of any token that has no value.
pub const PLACEHOLDER: &str = "-";
pub const SECONDARY_ISSUE_COUNT: usize = 3;

pub type TokenMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    #[serde(rename = "heroTitle")]
    pub hero_title: String,
    #[serde(rename = "heroSubtitle")]
    pub hero_subtitle: String,
    pub why: Vec<String>,
    pub rx_72h: Vec<String>,
    pub rx_14d: Vec<String>,
    pub rx_30d: Vec<String>,
    #[serde(rename = "recommendedProducts")]
    pub recommended_products: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecondaryIssue {
    pub id: String,
    pub label: String,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPartial {
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPartials {
    pub financial_snapshot: RenderedPartial,
    pub paywall: RenderedPartial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendering {
    pub report: RenderedReport,
    pub secondary_issues: Vec<SecondaryIssue>,
    pub partials: RenderedPartials,
}

pub fn render(
    catalog: &Catalog,
    type_id: &str,
    answers: &Answers,
    metrics: &Metrics,
    dimensions: &DimensionScores,
) -> Rendering {
    let tokens = build_tokens(catalog, type_id, answers, metrics);
    let empty = ReportTemplate::default();
    let template = catalog.template(type_id).unwrap_or(&empty);

    let report = RenderedReport {
        hero_title: substitute(&template.hero_title, &tokens),
        hero_subtitle: substitute(&template.hero_subtitle, &tokens),
        why: substitute_all(&template.why, &tokens),
        rx_72h: substitute_all(&template.rx_72h, &tokens),
        rx_14d: substitute_all(&template.rx_14d, &tokens),
        rx_30d: substitute_all(&template.rx_30d, &tokens),
        recommended_products: substitute_all(&template.recommended_products, &tokens),
    };

    let secondary_issues = dimensions
        .bottom(SECONDARY_ISSUE_COUNT)
        .into_iter()
        .map(|(id, score)| SecondaryIssue {
            id: id.to_string(),
            label: catalog.dimension_label(id).unwrap_or(id).to_string(),
            score,
        })
        .collect();

    let partials = RenderedPartials {
        financial_snapshot: render_partial(&catalog.partials.financial_snapshot, &tokens),
        paywall: render_partial(&catalog.partials.paywall, &tokens),
    };

    Rendering {
        report,
        secondary_issues,
        partials,
    }
}

fn render_partial(partial: &PartialTemplate, tokens: &TokenMap) -> RenderedPartial {
    RenderedPartial {
        title: substitute(&partial.title, tokens),
        lines: substitute_all(&partial.lines, tokens),
    }
}

fn substitute_all(templates: &[String], tokens: &TokenMap) -> Vec<String> {
    templates
        .iter()
        .map(|template| substitute(template, tokens))
        .collect()
}

/// Replaces every `{{ name }}` with its token value, or [`PLACEHOLDER`] when
/// the token is unknown. An unterminated `{{` swallows the rest of the text.
pub fn substitute(template: &str, tokens: &TokenMap) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                let value = tokens.get(name).map(String::as_str).unwrap_or(PLACEHOLDER);
                rendered.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                rendered.push_str(PLACEHOLDER);
                rest = "";
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// Display values for every answered question (keyed by dot path), every
/// metric, and the chosen type label.
pub fn build_tokens(
    catalog: &Catalog,
    type_id: &str,
    answers: &Answers,
    metrics: &Metrics,
) -> TokenMap {
    let mut tokens = TokenMap::new();

    for question in &catalog.questions {
        collect_answer_tokens(&question.field, "", answers, &mut tokens);
    }

    for id in MetricId::ordered() {
        let value = metrics.get(id);
        let display = match id {
            MetricId::Contribution => format_currency(value),
            MetricId::GapRatio => format_ratio(value),
            _ => format_grouped(value),
        };
        tokens.insert(id.key().to_string(), display);
    }

    tokens.insert("type_id".to_string(), type_id.to_string());
    tokens.insert(
        "type_label".to_string(),
        catalog.type_label(type_id).unwrap_or(type_id).to_string(),
    );

    tokens
        .into_iter()
        .map(|(name, value)| (name, strip_braces(&value)))
        .collect()
}

fn collect_answer_tokens(field: &Field, parent: &str, answers: &Answers, tokens: &mut TokenMap) {
    let path = child_path(parent, &field.key);

    if field.kind.is_container() {
        for child in &field.fields {
            collect_answer_tokens(child, &path, answers, tokens);
        }
        return;
    }

    if let Some(display) = display_answer(field, &path, answers) {
        tokens.insert(path, display);
    }
}

fn display_answer(field: &Field, path: &str, answers: &Answers) -> Option<String> {
    let value = answers.answered(path)?;

    let numeric = |format: fn(f64) -> String| {
        coerce_number(value)
            .map(format)
            .or_else(|| value_text(value))
    };

    match field.kind {
        QuestionKind::SingleSelect => value_text(value).map(|selected| {
            field
                .option_label(&selected)
                .map(str::to_string)
                .unwrap_or(selected)
        }),
        QuestionKind::MultiSelect => {
            let labels: Vec<String> = answers
                .strings(path)
                .into_iter()
                .map(|selected| {
                    field
                        .option_label(&selected)
                        .map(str::to_string)
                        .unwrap_or(selected)
                })
                .collect();
            (!labels.is_empty()).then(|| labels.join(", "))
        }
        QuestionKind::Currency => numeric(format_currency),
        QuestionKind::Percent => numeric(format_percent),
        QuestionKind::Number => numeric(format_decimal),
        QuestionKind::Url | QuestionKind::Text | QuestionKind::File => {
            let parts = answers.strings(path);
            if parts.is_empty() {
                value_text(value)
            } else {
                Some(parts.join(", "))
            }
        }
        QuestionKind::Group | QuestionKind::Subgroup => None,
    }
}

fn strip_braces(value: &str) -> String {
    value.chars().filter(|ch| *ch != '{' && *ch != '}').collect()
}

/// Rounds to an integer and inserts thousands separators: `6000000` → `6,000,000`.
pub fn format_grouped(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

pub fn format_currency(value: f64) -> String {
    format!("{}원", format_grouped(value))
}

pub fn format_ratio(value: f64) -> String {
    format!("{value:.1}배")
}

/// Whole numbers are grouped; fractional values keep one decimal.
pub fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format_grouped(value)
    } else {
        format!("{value:.1}")
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{}%", format_decimal(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::metrics::compute_metrics;
    use crate::diagnosis::scoring::score_dimensions;
    use serde_json::json;

    fn tokens(pairs: &[(&str, &str)]) -> TokenMap {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_and_unknown_tokens() {
        let map = tokens(&[("store_name", "을지로 국수")]);
        assert_eq!(
            substitute("{{store_name}}, {{ store_name }} / {{nope}}", &map),
            "을지로 국수, 을지로 국수 / -"
        );
        assert_eq!(substitute("no tokens here", &map), "no tokens here");
        assert_eq!(substitute("", &map), "");
    }

    #[test]
    fn malformed_templates_never_leak_braces() {
        let map = tokens(&[("a", "x")]);
        let malformed = [
            "{{a", "tail {{", "{{{a}}}", "{{{{a}}}}", "{ {{a}} }", "{{}}", "x{{a}}{{",
        ];
        for template in malformed {
            let rendered = substitute(template, &map);
            assert!(!rendered.contains("{{"), "{template:?} rendered {rendered:?}");
        }
        assert_eq!(substitute("before {{a", &map), "before -");
    }

    #[test]
    fn formats_numbers_for_display() {
        assert_eq!(format_grouped(6_000_000.0), "6,000,000");
        assert_eq!(format_grouped(615.38), "615");
        assert_eq!(format_grouped(999.6), "1,000");
        assert_eq!(format_grouped(0.0), "0");
        assert_eq!(format_grouped(-1234.0), "-1,234");
        assert_eq!(format_currency(9750.0), "9,750원");
        assert_eq!(format_ratio(2.0513), "2.1배");
        assert_eq!(format_percent(35.0), "35%");
        assert_eq!(format_percent(12.5), "12.5%");
        assert_eq!(format_decimal(4.6), "4.6");
    }

    #[test]
    fn builds_tokens_from_labels_and_metrics() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let answers = Answers::from_value(json!({
            "store_name": "을지로 {{국수}}",
            "biz_stage": "new_90",
            "category": "mystery",
            "avg_ticket": 15000,
            "fixed_cost": "6,000,000",
            "variable_rate": 35,
            "monthly_teams": 300,
            "channels": ["place", "instagram"],
            "reviews": { "review_rating": 4.6 },
            "hooks": { "offer": { "offer_type": "gift" } }
        }));
        let metrics = compute_metrics(&answers);
        let map = build_tokens(&catalog, "bep_emergency", &answers, &metrics);

        assert_eq!(map["store_name"], "을지로 국수");
        assert_eq!(map["biz_stage"], "신규오픈");
        assert_eq!(map["category"], "mystery");
        assert_eq!(map["avg_ticket"], "15,000원");
        assert_eq!(map["fixed_cost"], "6,000,000원");
        assert_eq!(map["variable_rate"], "35%");
        assert_eq!(map["monthly_teams"], "300");
        assert_eq!(map["channels"], "네이버 플레이스, 인스타그램");
        assert_eq!(map["reviews.review_rating"], "4.6");
        assert_eq!(map["hooks.offer.offer_type"], "서비스 증정");
        assert_eq!(map["contribution"], "9,750원");
        assert_eq!(map["bep_monthly_teams"], "615");
        assert_eq!(map["bep_daily_teams"], "21");
        assert_eq!(map["current_daily_teams"], "10");
        assert_eq!(map["gap_ratio"], "2.1배");
        assert_eq!(map["type_label"], "손익분기 비상형");
        assert!(!map.contains_key("goal"));
    }

    #[test]
    fn renders_report_partials_and_secondary_issues() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let answers = Answers::from_value(json!({
            "store_name": "을지로 국수",
            "avg_ticket": 15000,
            "fixed_cost": 6000000,
            "variable_rate": 35,
            "monthly_teams": 300,
            "pain_points": ["low_traffic", "no_repeat"]
        }));
        let metrics = compute_metrics(&answers);
        let dimensions = score_dimensions(&catalog, &answers);
        let rendering = render(&catalog, "bep_emergency", &answers, &metrics, &dimensions);

        assert_eq!(
            rendering.report.hero_title,
            "을지로 국수, 지금은 손익분기까지 2.1배가 필요합니다"
        );
        assert!(!rendering.report.rx_72h.is_empty());
        assert_eq!(
            rendering.partials.financial_snapshot.title,
            "을지로 국수 손익 스냅샷"
        );
        assert!(rendering
            .partials
            .paywall
            .title
            .starts_with("손익분기 비상형"));

        let ids: Vec<&str> = rendering
            .secondary_issues
            .iter()
            .map(|issue| issue.id.as_str())
            .collect();
        assert_eq!(ids.len(), SECONDARY_ISSUE_COUNT);
        assert_eq!(rendering.secondary_issues[0].label, "유입");
        assert!(rendering
            .secondary_issues
            .windows(2)
            .all(|pair| pair[0].score <= pair[1].score));
    }

    #[test]
    fn unknown_type_renders_empty_report_without_panicking() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let answers = Answers::new();
        let metrics = compute_metrics(&answers);
        let dimensions = score_dimensions(&catalog, &answers);
        let rendering = render(&catalog, "ghost", &answers, &metrics, &dimensions);
        assert!(rendering.report.hero_title.is_empty());
        assert!(rendering.report.why.is_empty());
        assert_eq!(rendering.secondary_issues.len(), 3);
    }
}
