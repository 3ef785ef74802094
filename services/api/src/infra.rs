use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use storefit::config::CatalogConfig;
use storefit::diagnosis::{Answers, Catalog};
use storefit::error::AppError;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) started_at: DateTime<Utc>,
}

/// CLI flag first, then the configured path, then the built-in catalog.
pub(crate) fn resolve_catalog(
    configured: &CatalogConfig,
    override_path: Option<PathBuf>,
) -> Result<Catalog, AppError> {
    let config = match override_path {
        Some(path) => CatalogConfig { path: Some(path) },
        None => configured.clone(),
    };
    Ok(config.load()?)
}

/// Reads an answer set from a JSON file, or from stdin when `source` is `-`.
pub(crate) fn read_answers(source: &Path) -> Result<Answers, AppError> {
    let raw = if source == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(source)?
    };
    parse_answers(&raw)
}

pub(crate) fn parse_answers(raw: &str) -> Result<Answers, AppError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_answer_objects() {
        let answers = parse_answers(r#"{ "store_name": "을지로 포차", "monthly_teams": 400 }"#)
            .expect("answers parse");
        assert_eq!(answers.number("monthly_teams"), Some(400.0));
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(matches!(
            parse_answers("[1, 2, 3]"),
            Err(AppError::InvalidAnswers(_))
        ));
    }

    #[test]
    fn reads_answers_from_file() {
        let path = std::env::temp_dir()
            .join(format!("storefit-answers-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "repeat_rate": 12 }"#).expect("fixture written");
        let answers = read_answers(&path).expect("answers read");
        std::fs::remove_file(&path).ok();
        assert_eq!(answers.number("repeat_rate"), Some(12.0));
    }

    #[test]
    fn missing_answer_file_is_io_error() {
        let path = Path::new("/nonexistent/storefit/answers.json");
        assert!(matches!(read_answers(path), Err(AppError::Io(_))));
    }

    #[test]
    fn override_path_wins_over_configuration() {
        let configured = CatalogConfig::default();
        let missing = PathBuf::from("/nonexistent/storefit/catalog.json");
        assert!(matches!(
            resolve_catalog(&configured, Some(missing)),
            Err(AppError::Catalog(_))
        ));
        assert!(resolve_catalog(&configured, None).is_ok());
    }
}
