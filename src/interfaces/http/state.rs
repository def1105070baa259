use crate::application::TestDesignPipeline;
use crate::domain::error::{AppError, Result};
use crate::domain::pipeline::PipelineContext;
use crate::infrastructure::llm_clients::LLMClient;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

/// One context per session. Stages run on a snapshot taken out of the store
/// and the result is written back, so the lock is never held across a call.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, PipelineContext>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> Result<PipelineContext> {
        let ctx = PipelineContext::new(uuid::Uuid::new_v4().to_string());
        self.lock()?.insert(ctx.session_id.clone(), ctx.clone());
        Ok(ctx)
    }

    pub fn get(&self, session_id: &str) -> Result<PipelineContext> {
        self.lock()?
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))
    }

    /// Writes a context back, unless the session was deleted meanwhile.
    pub fn put(&self, ctx: PipelineContext) -> Result<()> {
        let mut sessions = self.lock()?;
        match sessions.get_mut(&ctx.session_id) {
            Some(slot) => {
                *slot = ctx;
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Session {} not found",
                ctx.session_id
            ))),
        }
    }

    pub fn remove(&self, session_id: &str) -> Result<()> {
        self.lock()?
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, PipelineContext>>> {
        self.sessions
            .lock()
            .map_err(|_| AppError::Internal("Session store lock poisoned".to_string()))
    }
}

pub struct HttpState {
    pub pipeline: TestDesignPipeline,
    pub llm_client: Arc<dyn LLMClient + Send + Sync>,
    pub sessions: SessionStore,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl HttpState {
    pub fn new(pipeline: TestDesignPipeline, llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        Self {
            pipeline,
            llm_client,
            sessions: SessionStore::new(),
            logs: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    if let Ok(mut logs) = logs.lock() {
        logs.push(entry.clone());
        if logs.len() > MAX_LOG_ENTRIES {
            logs.remove(0);
        }
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}
