mod state;

use crate::application::ScreenshotInput;
use crate::domain::error::AppError;
use crate::domain::generation_options::GenerationOptions;
use crate::domain::llm_config::LLMConfig;
use crate::domain::pipeline::{
    CoverageAnalysis, PipelineContext, RequirementExtraction, StageFailure, TestCaseSynthesis,
    UiCoverageAnalysis,
};
use crate::domain::test_type::TestType;
use crate::domain::ui_coverage::screen_name_from_file;
use crate::infrastructure::config::ServerSettings;
use crate::infrastructure::export::{self, build_export, coverage_text_report, ui_text_report};
use crate::infrastructure::llm_clients::ImageInput;
use actix_cors::Cors;
use actix_web::{
    delete, dev::Server, get, http::StatusCode, post, web, App, HttpResponse, HttpServer,
    Responder,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use state::{add_log, add_log_entry, HttpState, LogEntry, SessionStore};

#[derive(Deserialize)]
pub struct DocumentsRequest {
    pub paths: Vec<PathBuf>,
}

#[derive(Deserialize)]
pub struct ScreenshotRequest {
    pub path: PathBuf,
    #[serde(default)]
    pub screen_name: Option<String>,
}

#[derive(Deserialize)]
pub struct UiCoverageRequest {
    pub screenshots: Vec<ScreenshotRequest>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub sheet: Option<String>,
}

#[derive(Serialize)]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Serialize)]
pub struct DocumentsResponse {
    pub session_id: String,
    pub files: Vec<String>,
    pub skipped: Vec<crate::application::use_cases::document_ingestion::SkippedFile>,
    pub document_chars: usize,
}

/// Session state as the client sees it, with the derived views precomputed.
#[derive(Serialize)]
pub struct SessionView<'a> {
    pub session_id: &'a str,
    pub source_files: &'a [String],
    pub document_chars: usize,
    pub requirements: Option<&'a RequirementExtraction>,
    pub test_cases: Option<&'a TestCaseSynthesis>,
    pub test_types: Vec<TestType>,
    pub test_type_counts: BTreeMap<&'static str, usize>,
    pub coverage: Option<&'a CoverageAnalysis>,
    pub ui_analyses: Option<&'a UiCoverageAnalysis>,
    pub generated_at: Option<i64>,
    pub mapping_ratio: Option<f64>,
    pub one_to_one: bool,
    pub last_failure: Option<&'a StageFailure>,
}

/// Stored result of an analysis route. `failure` is set when the run just
/// made produced nothing usable and `result` is the earlier one, if any.
#[derive(Serialize)]
pub struct AnalysisResponse<'a, T> {
    pub result: Option<&'a T>,
    pub failure: Option<&'a StageFailure>,
}

impl<'a> SessionView<'a> {
    pub fn from_context(ctx: &'a PipelineContext) -> Self {
        let test_types: Vec<TestType> = ctx
            .test_case_records()
            .iter()
            .map(|record| record.test_type())
            .collect();
        let mut test_type_counts = BTreeMap::new();
        for test_type in &test_types {
            *test_type_counts.entry(test_type.label()).or_insert(0) += 1;
        }
        Self {
            session_id: &ctx.session_id,
            source_files: &ctx.source_files,
            document_chars: ctx.document_text.chars().count(),
            requirements: ctx.requirements.as_ref(),
            test_cases: ctx.test_cases.as_ref(),
            test_types,
            test_type_counts,
            coverage: ctx.coverage.as_ref(),
            ui_analyses: ctx.ui_analyses.as_ref(),
            generated_at: ctx.generated_at,
            mapping_ratio: ctx.mapping_ratio(),
            one_to_one: ctx.is_one_to_one(),
            last_failure: ctx.last_failure.as_ref(),
        }
    }
}

fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::ValidationError(_) | AppError::UnsupportedFileType(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::LLMInit(_) => StatusCode::PRECONDITION_FAILED,
        AppError::LLMUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::LLMError(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(data: &HttpState, action: &str, error: AppError) -> HttpResponse {
    add_log(
        &data.logs,
        "ERROR",
        "HttpApi",
        &format!("{} failed: {}", action, error),
    );
    HttpResponse::build(status_for(&error)).json(error)
}

fn session_json(ctx: &PipelineContext) -> HttpResponse {
    HttpResponse::Ok().json(SessionView::from_context(ctx))
}

#[post("/sessions")]
async fn create_session(data: web::Data<HttpState>) -> impl Responder {
    match data.sessions.create() {
        Ok(ctx) => {
            add_log(
                &data.logs,
                "INFO",
                "HttpApi",
                &format!("Created session {}", ctx.session_id),
            );
            HttpResponse::Created().json(SessionCreated {
                session_id: ctx.session_id,
            })
        }
        Err(e) => error_response(&data, "Create session", e),
    }
}

#[get("/sessions/{id}")]
async fn get_session(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    match data.sessions.get(&path) {
        Ok(ctx) => session_json(&ctx),
        Err(e) => error_response(&data, "Get session", e),
    }
}

#[delete("/sessions/{id}")]
async fn delete_session(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    match data.sessions.remove(&path) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&data, "Delete session", e),
    }
}

#[post("/sessions/{id}/documents")]
async fn upload_documents(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    req: web::Json<DocumentsRequest>,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Ingesting {} document(s) into {}", req.paths.len(), path),
    );

    let ctx = match data.sessions.get(&path) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&data, "Document ingestion", e),
    };
    // Parsing PDF, DOCX and spreadsheets is blocking work.
    let pipeline = data.pipeline.clone();
    let paths = req.into_inner().paths;
    let loaded = web::block(move || pipeline.load_documents(ctx, &paths))
        .await
        .unwrap_or_else(|e| Err(AppError::Internal(format!("Ingestion task failed: {}", e))));

    let result = loaded.and_then(|(ctx, report)| {
        let response = DocumentsResponse {
            session_id: ctx.session_id.clone(),
            files: report.files,
            skipped: report.skipped,
            document_chars: ctx.document_text.chars().count(),
        };
        data.sessions.put(ctx)?;
        Ok(response)
    });

    match result {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => error_response(&data, "Document ingestion", e),
    }
}

#[post("/sessions/{id}/generate")]
async fn generate(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    options: web::Json<GenerationOptions>,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Generating test cases for {} (negative_ratio={} domain={})",
            path, options.negative_ratio, options.domain_context
        ),
    );

    let ctx = match data.sessions.get(&path) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&data, "Generation", e),
    };
    let result = data.pipeline.generate(ctx, &options).await.and_then(|ctx| {
        data.sessions.put(ctx.clone())?;
        Ok(ctx)
    });

    match result {
        Ok(ctx) => session_json(&ctx),
        Err(e) => error_response(&data, "Generation", e),
    }
}

#[post("/sessions/{id}/coverage")]
async fn analyze_coverage(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Analyzing requirement coverage for {}", path),
    );

    let ctx = match data.sessions.get(&path) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&data, "Coverage analysis", e),
    };
    let result = data.pipeline.analyze_coverage(ctx).await.and_then(|ctx| {
        data.sessions.put(ctx.clone())?;
        Ok(ctx)
    });

    match result {
        Ok(ctx) => HttpResponse::Ok().json(AnalysisResponse {
            result: ctx.coverage.as_ref(),
            failure: ctx.last_failure.as_ref(),
        }),
        Err(e) => error_response(&data, "Coverage analysis", e),
    }
}

#[post("/sessions/{id}/ui-coverage")]
async fn analyze_ui_coverage(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    req: web::Json<UiCoverageRequest>,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Analyzing UI coverage for {} ({} screenshot(s))",
            path,
            req.screenshots.len()
        ),
    );

    let requests = req.into_inner().screenshots;
    let loaded = web::block(move || load_screenshots(&requests))
        .await
        .unwrap_or_else(|e| Err(AppError::Internal(format!("Screenshot loading failed: {}", e))));
    let screenshots = match loaded {
        Ok(screenshots) => screenshots,
        Err(e) => return error_response(&data, "UI coverage analysis", e),
    };
    let ctx = match data.sessions.get(&path) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&data, "UI coverage analysis", e),
    };
    let result = data
        .pipeline
        .analyze_ui(ctx, screenshots)
        .await
        .and_then(|ctx| {
            data.sessions.put(ctx.clone())?;
            Ok(ctx)
        });

    match result {
        Ok(ctx) => HttpResponse::Ok().json(AnalysisResponse {
            result: ctx.ui_analyses.as_ref(),
            failure: ctx.last_failure.as_ref(),
        }),
        Err(e) => error_response(&data, "UI coverage analysis", e),
    }
}

fn load_screenshots(requests: &[ScreenshotRequest]) -> crate::domain::error::Result<Vec<ScreenshotInput>> {
    requests
        .iter()
        .map(|request| {
            let image = ImageInput::from_path(&request.path)?;
            let screen_name = request
                .screen_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| {
                    let file_name = request
                        .path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .unwrap_or("screen");
                    screen_name_from_file(file_name)
                });
            Ok(ScreenshotInput { screen_name, image })
        })
        .collect()
}

#[get("/sessions/{id}/export")]
async fn export_test_cases(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<ExportQuery>,
) -> impl Responder {
    let ctx = match data.sessions.get(&path) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&data, "Export", e),
    };
    if ctx.test_case_records().is_empty() {
        return error_response(
            &data,
            "Export",
            AppError::ValidationError("Generate test cases first".to_string()),
        );
    }

    let workbook = build_export(ctx.test_case_records());
    let sheet_name = query.sheet.as_deref().unwrap_or(export::ALL_SHEET);
    let Some(sheet) = workbook.sheet(sheet_name) else {
        return error_response(
            &data,
            "Export",
            AppError::NotFound(format!(
                "Sheet '{}' not found. Available: {}",
                sheet_name,
                workbook.sheet_names().join(", ")
            )),
        );
    };

    match sheet.to_csv() {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{}.csv\"", sheet.name),
            ))
            .body(csv),
        Err(e) => error_response(&data, "Export", e),
    }
}

#[get("/sessions/{id}/coverage/report")]
async fn coverage_report(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let report = data.sessions.get(&path).and_then(|ctx| {
        ctx.coverage
            .and_then(|analysis| analysis.report)
            .ok_or_else(|| AppError::NotFound("No coverage report for this session".to_string()))
    });
    match report {
        Ok(report) => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(coverage_text_report(&report, chrono::Utc::now())),
        Err(e) => error_response(&data, "Coverage report", e),
    }
}

#[get("/sessions/{id}/ui-coverage/report")]
async fn ui_coverage_report(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let analysis = data.sessions.get(&path).and_then(|ctx| {
        ctx.ui_analyses
            .ok_or_else(|| AppError::NotFound("No UI analysis for this session".to_string()))
    });
    match analysis {
        Ok(analysis) => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(ui_text_report(&analysis, chrono::Utc::now())),
        Err(e) => error_response(&data, "UI coverage report", e),
    }
}

#[post("/models")]
async fn list_models(data: web::Data<HttpState>, config: web::Json<LLMConfig>) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Fetching models (provider={:?} base_url={})",
            config.provider, config.base_url
        ),
    );

    let mut config = config.into_inner();
    if config.api_key.is_none() {
        let server_config = data.pipeline.stages().config();
        if server_config.provider == config.provider {
            config.api_key = server_config.api_key.clone();
        }
    }

    match data.llm_client.list_models(&config).await {
        Ok(models) => HttpResponse::Ok().json(models),
        Err(e) => error_response(&data, "List models", e),
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    match data.logs.lock() {
        Ok(logs) => HttpResponse::Ok().json(&*logs),
        Err(_) => HttpResponse::InternalServerError().finish(),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(create_session)
            .service(get_session)
            .service(delete_session)
            .service(upload_documents)
            .service(generate)
            .service(analyze_coverage)
            .service(analyze_ui_coverage)
            .service(export_test_cases)
            .service(coverage_report)
            .service(ui_coverage_report)
            .service(list_models)
            .service(get_logs),
    );
}

pub fn start_server(state: HttpState, settings: &ServerSettings) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Local tool, any origin

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((settings.host.as_str(), settings.port))?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{TestDesignPipeline, TestDesignUseCase};
    use crate::domain::test_case::fixtures::test_case_json;
    use crate::infrastructure::config::PipelineSettings;
    use crate::infrastructure::llm_clients::scripted::ScriptedClient;
    use actix_web::test;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn state(responses: Vec<String>) -> web::Data<HttpState> {
        let client = Arc::new(ScriptedClient::new(responses));
        let config = LLMConfig {
            api_key: Some("sk-test".to_string()),
            ..LLMConfig::default()
        };
        let pipeline = TestDesignPipeline::new(TestDesignUseCase::new(
            client.clone(),
            config,
            PipelineSettings::default(),
        ));
        web::Data::new(HttpState::new(pipeline, client))
    }

    #[::core::prelude::v1::test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&AppError::ValidationError("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&AppError::LLMUnavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[actix_web::test]
    async fn test_generate_then_export_csv() {
        let responses = vec![
            json!({"total_requirements": 1, "requirements": [
                {"requirement_type": "UI", "title": "Login", "priority": "High"}
            ]})
            .to_string(),
            json!({"test_cases": [
                test_case_json("TC_001", "Login - Workflow"),
                test_case_json("TC_002", "Login - Negative Test")
            ]})
            .to_string(),
        ];
        let data = state(responses);
        let ctx = data.sessions.create().unwrap();
        data.sessions
            .put(ctx.clone().with_document("Users log in.", vec!["brd.txt".to_string()]))
            .unwrap();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{}/generate", ctx.session_id))
            .set_json(json!({}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["test_types"], json!(["Functional", "Negative"]));
        assert_eq!(body["test_type_counts"]["Negative"], json!(1));

        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/sessions/{}/export?sheet=Negative%20Tests",
                ctx.session_id
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body = test::read_body(resp).await;
        let csv = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("TC_002"));
    }

    #[actix_web::test]
    async fn test_unusable_coverage_reports_failure() {
        let responses = vec![
            json!({"requirements": [{"requirement_type": "UI", "title": "Login", "priority": "High"}]})
                .to_string(),
            json!({"test_cases": [test_case_json("TC_001", "Login - Workflow")]}).to_string(),
            "I could not compare these.".to_string(),
        ];
        let data = state(responses);
        let ctx = data.sessions.create().unwrap();
        data.sessions
            .put(ctx.clone().with_document("Users log in.", Vec::new()))
            .unwrap();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{}/generate", ctx.session_id))
            .set_json(json!({}))
            .to_request();
        let _: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{}/coverage", ctx.session_id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["result"].is_null());
        assert_eq!(body["failure"]["stage"], json!("coverage"));
        assert_eq!(body["failure"]["raw_response"], json!("I could not compare these."));

        let stored = data.sessions.get(&ctx.session_id).unwrap();
        assert_eq!(stored.test_case_records().len(), 1);
    }

    #[actix_web::test]
    async fn test_upload_documents_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brd.txt");
        std::fs::write(&path, "Users sign in with email.").unwrap();
        let data = state(Vec::new());
        let ctx = data.sessions.create().unwrap();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{}/documents", ctx.session_id))
            .set_json(json!({"paths": [path, dir.path().join("notes.bin")]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["files"], json!(["brd.txt"]));
        assert_eq!(body["skipped"].as_array().unwrap().len(), 1);

        let stored = data.sessions.get(&ctx.session_id).unwrap();
        assert!(stored.document_text.contains("Users sign in with email."));
    }

    #[actix_web::test]
    async fn test_unknown_session_is_404() {
        let data = state(Vec::new());
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/sessions/missing")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_coverage_without_test_cases_is_rejected() {
        let data = state(Vec::new());
        let ctx = data.sessions.create().unwrap();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri(&format!("/api/sessions/{}/coverage", ctx.session_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
