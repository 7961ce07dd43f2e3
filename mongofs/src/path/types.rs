use std::fmt;

/// Field used when a query path does not name one.
pub const DEFAULT_QUERY_FIELD: &str = "_id";

pub const STATS_FILE: &str = "stats.json";
pub const INDEXES_FILE: &str = "indexes.json";
pub const DATA_DIR: &str = "data";
pub const QUERY_DIR: &str = "query";
pub const QUERY_ALL_FILE: &str = "all.json";

/// How a document file is encoded, selected by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentEncoding {
    Json,
    Bson,
}

impl DocumentEncoding {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentEncoding::Json => "json",
            DocumentEncoding::Bson => "bson",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(DocumentEncoding::Json),
            "bson" => Some(DocumentEncoding::Bson),
            _ => None,
        }
    }

    /// File name of the document at `index` in this encoding, e.g. `3.bson`.
    pub fn file_name(&self, index: u64) -> String {
        format!("{index}.{}", self.extension())
    }
}

/// Root-level diagnostic files, each backed by one administrative command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    CurrentOp,
    ServerStatus,
    BuildInfo,
    HostInfo,
    ListCommands,
}

impl Diagnostic {
    pub const ALL: [Diagnostic; 5] = [
        Diagnostic::CurrentOp,
        Diagnostic::ServerStatus,
        Diagnostic::BuildInfo,
        Diagnostic::HostInfo,
        Diagnostic::ListCommands,
    ];

    /// Name of the administrative command, as sent to the server.
    pub fn command_name(&self) -> &'static str {
        match self {
            Diagnostic::CurrentOp => "currentOp",
            Diagnostic::ServerStatus => "serverStatus",
            Diagnostic::BuildInfo => "buildInfo",
            Diagnostic::HostInfo => "hostInfo",
            Diagnostic::ListCommands => "listCommands",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Diagnostic::CurrentOp => "currentOp.json",
            Diagnostic::ServerStatus => "serverStatus.json",
            Diagnostic::BuildInfo => "buildInfo.json",
            Diagnostic::HostInfo => "hostInfo.json",
            Diagnostic::ListCommands => "listCommands.json",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.file_name() == name)
    }
}

/// A `field == value` query addressed by a path under `query/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySpec {
    pub field: String,
    pub value: String,
}

impl QuerySpec {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        QuerySpec {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Query on the primary key.
    pub fn on_id(value: impl Into<String>) -> Self {
        Self::new(DEFAULT_QUERY_FIELD, value)
    }
}

/// One parsed virtual path. Created per request and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathNode {
    Root,
    Database {
        database: String,
    },
    Collection {
        database: String,
        collection: String,
    },
    Stats {
        database: String,
        collection: String,
    },
    Indexes {
        database: String,
        collection: String,
    },
    DataDir {
        database: String,
        collection: String,
    },
    DataDocument {
        database: String,
        collection: String,
        index: u64,
        encoding: DocumentEncoding,
    },
    QueryEmptyDir {
        database: String,
        collection: String,
    },
    QueryDir {
        database: String,
        collection: String,
        query: QuerySpec,
    },
    QueryDocument {
        database: String,
        collection: String,
        query: QuerySpec,
        index: u64,
        encoding: DocumentEncoding,
    },
    QueryAll {
        database: String,
        collection: String,
        query: QuerySpec,
    },
    Diagnostic(Diagnostic),
}

impl PathNode {
    /// Short variant name, used in log lines and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PathNode::Root => "Root",
            PathNode::Database { .. } => "Database",
            PathNode::Collection { .. } => "Collection",
            PathNode::Stats { .. } => "Stats",
            PathNode::Indexes { .. } => "Indexes",
            PathNode::DataDir { .. } => "DataDir",
            PathNode::DataDocument { .. } => "DataDocument",
            PathNode::QueryEmptyDir { .. } => "QueryEmptyDir",
            PathNode::QueryDir { .. } => "QueryDir",
            PathNode::QueryDocument { .. } => "QueryDocument",
            PathNode::QueryAll { .. } => "QueryAll",
            PathNode::Diagnostic(_) => "Diagnostic",
        }
    }

    pub fn database(&self) -> Option<&str> {
        match self {
            PathNode::Root | PathNode::Diagnostic(_) => None,
            PathNode::Database { database }
            | PathNode::Collection { database, .. }
            | PathNode::Stats { database, .. }
            | PathNode::Indexes { database, .. }
            | PathNode::DataDir { database, .. }
            | PathNode::DataDocument { database, .. }
            | PathNode::QueryEmptyDir { database, .. }
            | PathNode::QueryDir { database, .. }
            | PathNode::QueryDocument { database, .. }
            | PathNode::QueryAll { database, .. } => Some(database),
        }
    }

    pub fn collection(&self) -> Option<&str> {
        match self {
            PathNode::Root | PathNode::Diagnostic(_) | PathNode::Database { .. } => None,
            PathNode::Collection { collection, .. }
            | PathNode::Stats { collection, .. }
            | PathNode::Indexes { collection, .. }
            | PathNode::DataDir { collection, .. }
            | PathNode::DataDocument { collection, .. }
            | PathNode::QueryEmptyDir { collection, .. }
            | PathNode::QueryDir { collection, .. }
            | PathNode::QueryDocument { collection, .. }
            | PathNode::QueryAll { collection, .. } => Some(collection),
        }
    }

    /// Whether the node is presented as a directory.
    pub fn is_directory(&self) -> bool {
        matches!(
            self,
            PathNode::Root
                | PathNode::Database { .. }
                | PathNode::Collection { .. }
                | PathNode::DataDir { .. }
                | PathNode::QueryEmptyDir { .. }
                | PathNode::QueryDir { .. }
        )
    }

    /// Name of the node as it appears in its parent's listing.
    pub fn file_name(&self, separator: char) -> String {
        match self {
            PathNode::Root => separator.to_string(),
            PathNode::Database { database } => database.clone(),
            PathNode::Collection { collection, .. } => collection.clone(),
            PathNode::Stats { .. } => STATS_FILE.to_string(),
            PathNode::Indexes { .. } => INDEXES_FILE.to_string(),
            PathNode::DataDir { .. } => DATA_DIR.to_string(),
            PathNode::QueryEmptyDir { .. } => QUERY_DIR.to_string(),
            PathNode::QueryDir { query, .. } => query.value.clone(),
            PathNode::DataDocument {
                index, encoding, ..
            }
            | PathNode::QueryDocument {
                index, encoding, ..
            } => encoding.file_name(*index),
            PathNode::QueryAll { .. } => QUERY_ALL_FILE.to_string(),
            PathNode::Diagnostic(diagnostic) => diagnostic.file_name().to_string(),
        }
    }
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.database(), self.collection()) {
            (Some(db), Some(coll)) => write!(f, "{}({db}.{coll})", self.kind_name()),
            (Some(db), None) => write!(f, "{}({db})", self.kind_name()),
            _ => write!(f, "{}", self.kind_name()),
        }
    }
}

/// A database or collection name is usable in a path when it is non-empty
/// and contains no `.`, which would make it ambiguous with file names.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('.')
}

/// A query field must be a plain (possibly dotted) field path. A leading `$`
/// would turn the equality into a server operator such as `$where`.
pub fn is_valid_field(field: &str) -> bool {
    !field.is_empty() && !field.starts_with('$')
}
