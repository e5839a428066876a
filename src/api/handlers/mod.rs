// src/api/handlers/mod.rs
mod health;
mod problems;
mod runs;
mod testcases;
pub mod ws;

use actix_web::HttpResponse;
use serde_json::json;

use crate::errors::RunnerError;

pub use health::health_check;
pub use problems::{generate_problems, list_languages};
pub use runs::run_code;
pub use testcases::generate_tests;
pub use ws::{ws_handler, RunUpdate, WsBroker};

/// Maps a library error onto an HTTP response with a JSON `error` body.
pub(crate) fn error_response(e: &RunnerError) -> HttpResponse {
    let body = json!({ "error": e.to_string() });
    match e {
        RunnerError::Config(_)
        | RunnerError::InvalidFunctionName(_)
        | RunnerError::UnsupportedLanguage(_)
        | RunnerError::UnknownRole { .. } => HttpResponse::BadRequest().json(body),
        RunnerError::RateLimited => HttpResponse::TooManyRequests().json(body),
        RunnerError::Request(_)
        | RunnerError::ApiError { .. }
        | RunnerError::ApiResponse(_)
        | RunnerError::UnexpectedResponse(_)
        | RunnerError::EmptyResponse
        | RunnerError::NoTestCases
        | RunnerError::KataFetch { .. } => HttpResponse::BadGateway().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}
