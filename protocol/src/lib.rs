//! Shared data model for the graphex workspace: catalog elements, query
//! execution results, history sync messages, and the history file naming
//! scheme. Everything here is a compatibility contract between the core,
//! the backend client, and the presentation surface.

pub mod catalog;
pub mod history;

pub use catalog::CatalogElement;
pub use catalog::ElementKind;
pub use catalog::collection_path;
pub use catalog::database_path;
pub use history::ExecutionResult;
pub use history::HistoryMessage;
pub use history::RESULT_FILE_PREFIX;
pub use history::RESULT_SCHEME;
pub use history::display_timestamp;
pub use history::is_result_file_name;
pub use history::result_file_name;
pub use history::result_uri;
