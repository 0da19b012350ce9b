pub mod enrichment;
pub mod google;
pub mod llm;
pub mod storage;
