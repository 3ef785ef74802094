use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::AppError;

use super::answers::Answers;
use super::catalog::{Dimension, Question, TypeDef};
use super::DiagnosisEngine;

/// Router builder exposing the diagnosis engine over HTTP.
pub fn diagnosis_router(engine: Arc<DiagnosisEngine>) -> Router {
    Router::new()
        .route("/api/v1/diagnosis", post(diagnose_handler))
        .route("/api/v1/diagnosis/explain", post(explain_handler))
        .route("/api/v1/catalog/questions", get(questions_handler))
        .with_state(engine)
}

/// Bodies that are not a JSON object are rejected with 400.
fn parse_answers(body: &[u8]) -> Result<Answers, AppError> {
    Ok(serde_json::from_slice(body)?)
}

pub(crate) async fn diagnose_handler(
    State(engine): State<Arc<DiagnosisEngine>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let answers = parse_answers(&body)?;
    let diagnosis = engine.evaluate(&answers);
    Ok((StatusCode::OK, Json(diagnosis)).into_response())
}

pub(crate) async fn explain_handler(
    State(engine): State<Arc<DiagnosisEngine>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let answers = parse_answers(&body)?;
    let trace = engine.explain(&answers);
    Ok((StatusCode::OK, Json(trace)).into_response())
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionnaireView<'a> {
    dimensions: &'a [Dimension],
    types: &'a [TypeDef],
    questions: &'a [Question],
}

pub(crate) async fn questions_handler(State(engine): State<Arc<DiagnosisEngine>>) -> Response {
    let catalog = engine.catalog();
    let view = QuestionnaireView {
        dimensions: &catalog.dimensions,
        types: &catalog.types,
        questions: &catalog.questions,
    };
    (StatusCode::OK, Json(view)).into_response()
}
