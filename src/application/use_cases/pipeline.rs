use crate::application::use_cases::document_ingestion::{DocumentIngestion, IngestionReport};
use crate::application::use_cases::test_design::{ScreenshotInput, TestDesignUseCase};
use crate::domain::error::{AppError, Result};
use crate::domain::generation_options::GenerationOptions;
use crate::domain::pipeline::PipelineContext;
use std::path::Path;
use tracing::{info, warn};
use validator::Validate;

/// Runs the stages against a session's context. Each method takes the
/// context by value and hands back the updated one.
#[derive(Clone)]
pub struct TestDesignPipeline {
    stages: TestDesignUseCase,
    ingestion: DocumentIngestion,
}

impl TestDesignPipeline {
    pub fn new(stages: TestDesignUseCase) -> Self {
        Self {
            stages,
            ingestion: DocumentIngestion::new(),
        }
    }

    pub fn stages(&self) -> &TestDesignUseCase {
        &self.stages
    }

    /// Replaces the context's document with the batch text. Skipped files
    /// are reported, not fatal; an entirely unreadable batch is.
    pub fn load_documents<P: AsRef<Path>>(
        &self,
        mut ctx: PipelineContext,
        paths: &[P],
    ) -> Result<(PipelineContext, IngestionReport)> {
        let report = self.ingestion.ingest_batch(paths);
        if report.files.is_empty() {
            return Err(AppError::ValidationError(
                "None of the uploaded files could be read".to_string(),
            ));
        }
        ctx.apply_document(report.text.clone(), report.files.clone());
        Ok((ctx, report))
    }

    /// Requirement extraction, then synthesis. A run that yields no test cases
    /// keeps the previous results and lands in `last_failure`; only bad input
    /// or oracle setup returns `Err`.
    pub async fn generate(
        &self,
        mut ctx: PipelineContext,
        options: &GenerationOptions,
    ) -> Result<PipelineContext> {
        options.validate()?;
        self.stages.config().ensure_ready()?;
        if !ctx.has_document() {
            return Err(AppError::ValidationError(
                "Upload a requirements document first".to_string(),
            ));
        }

        let extraction = self.stages.extract_requirements(&ctx.document_text).await;
        let synthesis = self
            .stages
            .synthesize_test_cases(&ctx.document_text, &extraction, options)
            .await;
        info!(
            session_id = %ctx.session_id,
            requirements = extraction.requirements.len(),
            test_cases = synthesis.test_cases.len(),
            "Generation finished"
        );

        // Requirements and test cases are kept as a pair.
        if ctx.apply_test_cases(synthesis) {
            ctx.apply_requirements(extraction);
        } else {
            warn!(session_id = %ctx.session_id, "Generation produced no test cases, keeping previous results");
        }
        Ok(ctx)
    }

    pub async fn analyze_coverage(&self, mut ctx: PipelineContext) -> Result<PipelineContext> {
        self.stages.config().ensure_ready()?;
        require_test_cases(&ctx)?;

        let analysis = self
            .stages
            .reconcile_coverage(&ctx.document_text, ctx.test_case_records())
            .await;
        if !ctx.apply_coverage(analysis) {
            warn!(session_id = %ctx.session_id, "Coverage run unusable, keeping previous report");
        }
        Ok(ctx)
    }

    pub async fn analyze_ui(
        &self,
        mut ctx: PipelineContext,
        screenshots: Vec<ScreenshotInput>,
    ) -> Result<PipelineContext> {
        self.stages.config().ensure_ready()?;
        require_test_cases(&ctx)?;
        if screenshots.is_empty() {
            return Err(AppError::ValidationError(
                "At least one screenshot is required".to_string(),
            ));
        }

        let analysis = self
            .stages
            .analyze_screens(screenshots, ctx.test_case_records())
            .await;
        if !ctx.apply_ui_analyses(analysis) {
            warn!(session_id = %ctx.session_id, "Every screen failed, keeping previous UI analysis");
        }
        Ok(ctx)
    }
}

fn require_test_cases(ctx: &PipelineContext) -> Result<()> {
    if ctx.test_case_records().is_empty() {
        return Err(AppError::ValidationError(
            "Generate test cases first".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMConfig;
    use crate::domain::test_case::fixtures::test_case_json;
    use crate::infrastructure::config::PipelineSettings;
    use crate::infrastructure::llm_clients::scripted::ScriptedClient;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Arc;

    fn pipeline(client: Arc<ScriptedClient>) -> TestDesignPipeline {
        let config = LLMConfig {
            api_key: Some("sk-test".to_string()),
            ..LLMConfig::default()
        };
        TestDesignPipeline::new(TestDesignUseCase::new(
            client,
            config,
            PipelineSettings::default(),
        ))
    }

    fn generation_responses() -> Vec<String> {
        vec![
            json!({"total_requirements": 1, "requirements": [
                {"requirement_type": "UI", "title": "Login", "priority": "High"}
            ]})
            .to_string(),
            json!({"test_cases": [
                test_case_json("TC_001", "Login - Workflow"),
                test_case_json("TC_002", "Login - Negative Test")
            ]})
            .to_string(),
        ]
    }

    fn document_ctx() -> PipelineContext {
        PipelineContext::new("s1").with_document("Users log in.", vec!["brd.txt".to_string()])
    }

    #[tokio::test]
    async fn test_generate_fills_requirements_and_test_cases() {
        let client = Arc::new(ScriptedClient::new(generation_responses()));
        let ctx = pipeline(client)
            .generate(document_ctx(), &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(ctx.requirement_list().len(), 1);
        assert_eq!(ctx.requirement_list()[0].id, "REQ-001");
        assert_eq!(ctx.test_case_records().len(), 2);
        assert!(ctx.generated_at.is_some());
    }

    #[tokio::test]
    async fn test_regenerate_clears_derived_analyses() {
        let mut responses = generation_responses();
        responses.push(
            json!({"covered_requirements": [], "missing_requirements": [], "summary": "none"})
                .to_string(),
        );
        responses.extend(generation_responses());
        let pipeline = pipeline(Arc::new(ScriptedClient::new(responses)));

        let ctx = pipeline
            .generate(document_ctx(), &GenerationOptions::default())
            .await
            .unwrap();
        let ctx = pipeline.analyze_coverage(ctx).await.unwrap();
        assert!(ctx.coverage.is_some());

        let ctx = pipeline
            .generate(ctx, &GenerationOptions::default())
            .await
            .unwrap();
        assert!(ctx.coverage.is_none());
    }

    #[tokio::test]
    async fn test_failed_regeneration_keeps_stored_results() {
        let mut responses: Vec<Result<String>> =
            generation_responses().into_iter().map(Ok).collect();
        responses.push(Ok(json!({
            "covered_requirements": [{"requirement": "Login", "requirement_id": "REQ-001",
                                      "covered_by": ["TC_001"], "coverage_level": "Full"}],
            "missing_requirements": []
        })
        .to_string()));
        responses.push(Ok(generation_responses().remove(0)));
        responses.push(Err(AppError::LLMUnavailable("connection reset".to_string())));
        let pipeline = pipeline(Arc::new(ScriptedClient::with_results(responses)));

        let ctx = pipeline
            .generate(document_ctx(), &GenerationOptions::default())
            .await
            .unwrap();
        let ctx = pipeline.analyze_coverage(ctx).await.unwrap();
        let generated_at = ctx.generated_at;

        let ctx = pipeline
            .generate(ctx, &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(ctx.test_case_records().len(), 2);
        assert!(ctx.coverage.as_ref().unwrap().report.is_some());
        assert_eq!(ctx.generated_at, generated_at);
        let failure = ctx.last_failure.unwrap();
        assert_eq!(failure.stage, "test_case_synthesis");
        assert!(failure.error.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_invalid_options_are_rejected_before_any_call() {
        let client = Arc::new(ScriptedClient::new(generation_responses()));
        let options = GenerationOptions {
            negative_ratio: 40,
            ..GenerationOptions::default()
        };
        let result = pipeline(client.clone()).generate(document_ctx(), &options).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_is_reported_once_up_front() {
        let client = Arc::new(ScriptedClient::new(generation_responses()));
        let pipeline = TestDesignPipeline::new(TestDesignUseCase::new(
            client.clone(),
            LLMConfig::default(),
            PipelineSettings::default(),
        ));
        let result = pipeline
            .generate(document_ctx(), &GenerationOptions::default())
            .await;
        assert!(matches!(result, Err(AppError::LLMInit(_))));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_analyses_require_test_cases() {
        let client = Arc::new(ScriptedClient::new(Vec::<String>::new()));
        let pipeline = pipeline(client);
        let result = pipeline.analyze_coverage(document_ctx()).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
        let result = pipeline.analyze_ui(document_ctx(), Vec::new()).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_load_documents_replaces_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brd.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Login requirements").unwrap();

        let client = Arc::new(ScriptedClient::new(Vec::<String>::new()));
        let (ctx, report) = pipeline(client)
            .load_documents(PipelineContext::new("s1"), &[path])
            .unwrap();
        assert!(ctx.document_text.contains("Login requirements"));
        assert_eq!(report.files, vec!["brd.txt".to_string()]);

        let unreadable = dir.path().join("notes.bin");
        std::fs::write(&unreadable, b"\0").unwrap();
        let client = Arc::new(ScriptedClient::new(Vec::<String>::new()));
        assert!(pipeline(client)
            .load_documents(PipelineContext::new("s1"), &[unreadable])
            .is_err());
    }
}
