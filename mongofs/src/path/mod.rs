// Path grammar - virtual node model and the parser that produces it

pub mod parser;
pub mod types;

pub use parser::{parse_document_index, GrammarRule, PathParser, GRAMMAR};
pub use types::{
    is_valid_field, is_valid_name, Diagnostic, DocumentEncoding, PathNode, QuerySpec,
    DATA_DIR, DEFAULT_QUERY_FIELD, INDEXES_FILE, QUERY_ALL_FILE, QUERY_DIR, STATS_FILE,
};
