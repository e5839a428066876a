// src/api/handlers/runs.rs
use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::handlers::ws::{RunUpdate, WsBroker};
use crate::pipeline::{Pipeline, RunRequest};
use crate::transport::ReqwestTransport;

use super::error_response;

/// Session a run belongs to: the requested one, else the client's IP.
fn session_key(http: &HttpRequest, requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| http.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn run_code(
    http: HttpRequest,
    state: web::Data<AppState>,
    broker: web::Data<WsBroker>,
    req: web::Json<RunRequest>,
) -> Result<HttpResponse> {
    let request = req.into_inner();
    if request.source.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({ "error": "Source code is empty" })));
    }

    let pipeline = match Pipeline::new(ReqwestTransport::new(state.client.clone()), &state.config) {
        Ok(pipeline) => pipeline,
        Err(e) => return Ok(error_response(&e)),
    };
    let run_id = Uuid::new_v4().to_string();
    let session = session_key(&http, request.session_id.as_deref());

    // State changes are forwarded to websocket clients as they happen.
    let (tx, mut rx) = mpsc::unbounded_channel::<RunUpdate>();
    let broker = broker.get_ref().clone();
    actix_web::rt::spawn(async move {
        while let Some(update) = rx.recv().await {
            broker.broadcast(update).await;
        }
    });

    let task_id = run_id.clone();
    let task_session = session.clone();
    let handle = state
        .runs
        .start(&session, &run_id, async move {
            pipeline
                .run(&task_id, &request, |run_state| {
                    let _ = tx.send(RunUpdate {
                        run_id: task_id.clone(),
                        session_id: task_session.clone(),
                        state: run_state,
                    });
                })
                .await
        })
        .await;

    let joined = handle.await;
    state.runs.finish(&session, &run_id).await;

    match joined {
        Ok(Ok(report)) => Ok(HttpResponse::Ok().json(report)),
        Ok(Err(e)) => Ok(error_response(&e)),
        Err(join) if join.is_cancelled() => Ok(HttpResponse::Conflict().json(json!({
            "run_id": run_id,
            "error": "Run superseded by a newer run"
        }))),
        Err(join) => {
            log::error!("Run {} panicked: {}", run_id, join);
            Ok(HttpResponse::InternalServerError().json(json!({
                "run_id": run_id,
                "error": "Run failed unexpectedly"
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_session_key_prefers_requested_id() {
        let http = TestRequest::default()
            .peer_addr("10.0.0.7:51234".parse().unwrap())
            .to_http_request();

        assert_eq!(session_key(&http, Some(" editor-1 ")), "editor-1");
        assert_eq!(session_key(&http, Some("")), "10.0.0.7");
        assert_eq!(session_key(&http, None), "10.0.0.7");
        assert_eq!(session_key(&TestRequest::default().to_http_request(), None), "anonymous");
    }
}
