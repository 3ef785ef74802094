//! Food-service business diagnosis: questionnaire answers in, health
//! dimension scores, break-even metrics, a diagnosis type and a rendered
//! report out.

pub mod config;
pub mod diagnosis;
pub mod error;
pub mod telemetry;
