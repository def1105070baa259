use crate::application::{TestDesignPipeline, TestDesignUseCase};
use crate::domain::error::Result;
use crate::infrastructure::config::ConfigService;
use crate::infrastructure::llm_clients::{LLMClient, RetryingClient, RouterClient};
use crate::interfaces::http::{add_log, start_server, HttpState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run(config_path: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut settings = ConfigService::new().load(config_path.as_deref())?;
    if let Some(port) = port {
        settings.server.port = port;
    }

    // Stage requests re-check this, so a bad key only disables generation.
    if let Err(e) = settings.llm.ensure_ready() {
        warn!(error = %e, "LLM configuration is not usable yet");
    }

    let llm_client: Arc<dyn LLMClient + Send + Sync> = Arc::new(RetryingClient::new(
        Arc::new(RouterClient::new()),
        settings.pipeline.retry.clone(),
    ));
    let stages = TestDesignUseCase::new(
        llm_client.clone(),
        settings.llm.clone(),
        settings.pipeline.clone(),
    )
    .load_synthesis_framework()?;

    let state = HttpState::new(TestDesignPipeline::new(stages), llm_client);
    let logs = state.logs.clone();
    let server = start_server(state, &settings.server)?;

    info!(
        host = %settings.server.host,
        port = settings.server.port,
        provider = settings.llm.provider.as_str(),
        model = %settings.llm.model,
        "HTTP server started"
    );
    add_log(
        &logs,
        "INFO",
        "System",
        &format!(
            "Backend initialized and HTTP server started on {}:{}",
            settings.server.host, settings.server.port
        ),
    );

    server.await?;
    Ok(())
}
