use crate::infra::{read_answers, resolve_catalog};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use storefit::config::AppConfig;
use storefit::diagnosis::{Catalog, DiagnosisEngine};
use storefit::error::AppError;
use storefit::telemetry;

#[derive(Args, Debug)]
pub(crate) struct DiagnoseArgs {
    /// Answer set as a JSON object; `-` reads stdin
    #[arg(long)]
    pub(crate) answers: PathBuf,
    /// Pretty-print the JSON output
    #[arg(long)]
    pub(crate) pretty: bool,
    /// Include the score steps and the matched rule
    #[arg(long)]
    pub(crate) explain: bool,
    /// Catalog JSON to use instead of STOREFIT_CATALOG or the built-in one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Catalog JSON to use instead of STOREFIT_CATALOG or the built-in one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) fn run_diagnose(args: DiagnoseArgs) -> Result<(), AppError> {
    let DiagnoseArgs {
        answers,
        pretty,
        explain,
        catalog,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let engine = DiagnosisEngine::new(resolve_catalog(&config.catalog, catalog)?);
    let answers = read_answers(&answers)?;

    let output = if explain {
        to_json(&engine.explain(&answers), pretty)?
    } else {
        to_json(&engine.evaluate(&answers), pretty)?
    };
    println!("{output}");
    Ok(())
}

pub(crate) fn run_catalog_validate(args: CatalogArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let catalog = resolve_catalog(&config.catalog, args.catalog)?;
    println!(
        "catalog ok: {} dimensions, {} types, {} questions, {} rules",
        catalog.dimensions.len(),
        catalog.types.len(),
        catalog.questions.len(),
        catalog.rules.len()
    );
    Ok(())
}

pub(crate) fn run_catalog_show(args: CatalogArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let catalog = resolve_catalog(&config.catalog, args.catalog)?;
    let overview = CatalogOverview::from_catalog(&catalog);

    println!("Dimensions (tie-break order):");
    for dimension in &overview.dimensions {
        println!("  - {dimension}");
    }
    println!("Rules (evaluation order):");
    for rule in &overview.rules {
        println!(
            "  - [{}] {} ({} all / {} any)",
            rule.priority, rule.type_label, rule.all, rule.any
        );
    }
    println!("Fallback:");
    for (dimension, type_label) in &overview.fallback {
        println!("  - lowest {dimension} -> {type_label}");
    }
    println!("  - otherwise -> {}", overview.fallback_default);
    println!("Questions: {}", overview.question_count);
    Ok(())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, AppError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.map_err(AppError::Output)
}

#[derive(Debug, Serialize)]
pub(crate) struct RuleOverview {
    pub(crate) priority: i32,
    pub(crate) type_label: String,
    pub(crate) all: usize,
    pub(crate) any: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct CatalogOverview {
    pub(crate) dimensions: Vec<String>,
    pub(crate) rules: Vec<RuleOverview>,
    pub(crate) fallback: Vec<(String, String)>,
    pub(crate) fallback_default: String,
    pub(crate) question_count: usize,
}

impl CatalogOverview {
    pub(crate) fn from_catalog(catalog: &Catalog) -> Self {
        let label_of = |type_id: &str| {
            catalog
                .type_label(type_id)
                .map(|label| format!("{label} ({type_id})"))
                .unwrap_or_else(|| type_id.to_string())
        };

        let rules: Vec<RuleOverview> = catalog
            .rules
            .iter()
            .map(|rule| RuleOverview {
                priority: rule.priority,
                type_label: label_of(&rule.type_id),
                all: rule.all_conditions().len(),
                any: rule.any_conditions().len(),
            })
            .collect();

        let fallback = catalog
            .dimensions
            .iter()
            .filter_map(|dimension| {
                catalog
                    .fallback
                    .by_dimension
                    .get(&dimension.id)
                    .map(|type_id| (dimension.label.clone(), label_of(type_id)))
            })
            .collect();

        Self {
            dimensions: catalog
                .dimensions
                .iter()
                .map(|dimension| format!("{} ({})", dimension.label, dimension.id))
                .collect(),
            rules,
            fallback,
            fallback_default: label_of(&catalog.fallback.default),
            question_count: catalog.questions.len(),
        }
    }
}
