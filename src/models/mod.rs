pub mod batch;
pub mod decode;
pub mod loaders;
pub mod question;
pub mod subject;
pub mod table;

pub use batch::{Batch, BatchId};
pub use decode::{decode_json, decode_row, ChoicesFormat};
pub use loaders::{load_import_file, load_knowledge_file, KnowledgeFile, LoadedRecord};
pub use question::{QuestionRecord, ValidationError, CHOICE_COUNT};
pub use subject::{GenreCatalog, Subject};
pub use table::{Table, TableRow};
