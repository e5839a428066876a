// src/api/handlers/problems.rs
use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::kata::{self, CodewarsClient};
use crate::models::Language;

use super::error_response;

#[derive(Serialize)]
pub struct LanguageInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub judge0_id: u32,
    pub piston: &'static str,
}

pub async fn list_languages() -> Result<HttpResponse> {
    let languages: Vec<LanguageInfo> = Language::ALL
        .iter()
        .map(|lang| LanguageInfo {
            id: lang.id(),
            name: lang.display_name(),
            judge0_id: lang.judge0_id(),
            piston: lang.piston_name(),
        })
        .collect();
    Ok(HttpResponse::Ok().json(languages))
}

#[derive(Deserialize)]
pub struct GenerateProblemsRequest {
    pub job_role: String,
    pub experience: u32,
}

pub async fn generate_problems(
    state: web::Data<AppState>,
    req: web::Json<GenerateProblemsRequest>,
) -> Result<HttpResponse> {
    let source = CodewarsClient::new(state.client.clone(), state.config.kata.api_base.clone());

    match kata::generate_problems(&source, &state.catalog, &req.job_role, req.experience).await {
        Ok(problems) => Ok(HttpResponse::Ok().json(problems)),
        Err(e) => {
            log::error!("Problem generation failed: {}", e);
            Ok(error_response(&e))
        }
    }
}
