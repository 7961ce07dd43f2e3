pub mod config;
pub mod error;
pub mod fs;
pub mod path;
pub mod predicate;
pub mod projection;
pub mod resolver;
pub mod store;

pub use config::Config;
pub use error::{MongoFsError, Result};
pub use fs::{FsError, FsResult, MongoFs};
pub use path::{PathNode, PathParser};
pub use store::{open_store, DocumentStore, MemoryStore, MongoStore};
