pub mod use_cases;

pub use use_cases::document_ingestion::{DocumentIngestion, IngestionReport};
pub use use_cases::pipeline::TestDesignPipeline;
pub use use_cases::test_design::{ScreenshotInput, TestDesignUseCase};
