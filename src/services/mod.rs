pub mod block_extractor;
pub mod prompt_builder;
pub mod response_parser;
pub mod shuffler;

pub use block_extractor::{merge_document, BlockOutcome, DocumentMerge, MergedDocument};
pub use prompt_builder::{GenerationMode, GenerationRequest, PromptBuilder};
pub use response_parser::{parse_response, ParseReport, RowDiagnostic};
pub use shuffler::{ChoiceShuffler, IndexDistribution};
