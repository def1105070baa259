pub mod coverage;
pub mod error;
pub mod generation_options;
pub mod lenient;
pub mod llm_config;
pub mod oracle_run;
pub mod pipeline;
pub mod priority;
pub mod record_issue;
pub mod requirement;
pub mod test_case;
pub mod test_type;
pub mod ui_coverage;
