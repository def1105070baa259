pub mod document_ingestion;
pub mod pipeline;
pub mod structured_output;
pub mod test_design;
