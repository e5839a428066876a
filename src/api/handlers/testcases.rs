// src/api/handlers/testcases.rs
use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;

use crate::api::AppState;
use crate::models::Problem;
use crate::providers::gemini::GeminiProvider;
use crate::testgen::TestCaseGenerator;

use super::error_response;

#[derive(Deserialize)]
pub struct GenerateTestsRequest {
    pub problem: Problem,
    #[serde(default)]
    pub function_name: Option<String>,
}

pub async fn generate_tests(
    state: web::Data<AppState>,
    req: web::Json<GenerateTestsRequest>,
) -> Result<HttpResponse> {
    let gemini = match state.config.require_gemini() {
        Ok(gemini) => gemini.clone(),
        Err(e) => return Ok(error_response(&e)),
    };
    let model = gemini.model.clone();
    let generator = TestCaseGenerator::new(GeminiProvider::new(state.client.clone(), gemini), model);

    match generator.generate(&req.problem, req.function_name.as_deref()).await {
        Ok(cases) => Ok(HttpResponse::Ok().json(cases)),
        Err(e) => {
            log::error!("Error generating test cases: {}", e);
            Ok(error_response(&e))
        }
    }
}
