use super::types::{
    is_valid_field, is_valid_name, Diagnostic, DocumentEncoding, PathNode, QuerySpec, DATA_DIR,
    INDEXES_FILE, QUERY_ALL_FILE, QUERY_DIR, STATS_FILE,
};
use crate::error::{MongoFsError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

const BAD_DB_COLL: &str = "Invalid database or collection name.";
const UNRECOGNIZED: &str = "Unrecognized path.";
const BAD_FIELD: &str = "Invalid query field name.";

/// A grammar rule receives exactly `segments` path segments and either
/// produces a node or explains why the path does not match.
pub type RuleFn = fn(&[&str]) -> std::result::Result<PathNode, &'static str>;

/// One entry of the dispatch table: the rule for a given segment count.
#[derive(Clone, Copy)]
pub struct GrammarRule {
    pub segments: usize,
    pub name: &'static str,
    pub parse: RuleFn,
}

/// The path grammar. Each segment count appears exactly once.
pub const GRAMMAR: &[GrammarRule] = &[
    GrammarRule {
        segments: 1,
        name: "database",
        parse: parse_one_segment,
    },
    GrammarRule {
        segments: 2,
        name: "collection",
        parse: parse_collection,
    },
    GrammarRule {
        segments: 3,
        name: "collection-entry",
        parse: parse_collection_entry,
    },
    GrammarRule {
        segments: 4,
        name: "data-document-or-query",
        parse: parse_four_segments,
    },
    GrammarRule {
        segments: 5,
        name: "query-on-id-or-field",
        parse: parse_five_segments,
    },
    GrammarRule {
        segments: 6,
        name: "query-on-field",
        parse: parse_six_segments,
    },
];

/// Parses absolute path strings into [`PathNode`]s.
///
/// The dispatch table is built once in [`PathParser::new`]; a table that
/// registers two rules for the same segment count is rejected there.
pub struct PathParser {
    separator: char,
    rules: HashMap<usize, GrammarRule>,
}

impl PathParser {
    /// Build a parser for the standard grammar.
    pub fn new(separator: char) -> Result<Self> {
        Self::with_rules(separator, GRAMMAR)
    }

    /// Build a parser from an explicit rule table.
    pub fn with_rules(separator: char, rules: &[GrammarRule]) -> Result<Self> {
        let mut table: HashMap<usize, GrammarRule> = HashMap::new();
        for rule in rules {
            if let Some(existing) = table.get(&rule.segments) {
                return Err(MongoFsError::Grammar(format!(
                    "rules '{}' and '{}' both claim {} segment(s)",
                    existing.name, rule.name, rule.segments
                )));
            }
            table.insert(rule.segments, *rule);
        }
        Ok(PathParser {
            separator,
            rules: table,
        })
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Parse a path. Unrecognized input yields `None` and is logged at trace level.
    pub fn parse(&self, input: &str) -> Option<PathNode> {
        if input.is_empty() {
            return log_failure(input, "Path is empty.");
        }
        if !input.starts_with(self.separator) {
            return log_failure(input, "Path is not absolute.");
        }
        if input.len() == self.separator.len_utf8() {
            return Some(PathNode::Root);
        }

        let segments: Vec<&str> = input
            .split(self.separator)
            .filter(|s| !s.is_empty())
            .collect();

        if segments.is_empty() {
            return Some(PathNode::Root);
        }

        let rule = match self.rules.get(&segments.len()) {
            Some(rule) => rule,
            None => return log_failure(input, UNRECOGNIZED),
        };

        match (rule.parse)(&segments) {
            Ok(node) => Some(node),
            Err(reason) => log_failure(input, reason),
        }
    }
}

fn log_failure(input: &str, reason: &str) -> Option<PathNode> {
    log::trace!("Can't parse {input:?} due to {reason}");
    None
}

fn document_index_regex() -> &'static Regex {
    static DOCUMENT_INDEX: OnceLock<Regex> = OnceLock::new();
    DOCUMENT_INDEX.get_or_init(|| {
        Regex::new(r"^([0-9]+)\.(json|bson)$").expect("document index pattern is valid")
    })
}

/// Match `<digits>.(json|bson)`, e.g. `0.json` or `123.bson`.
pub fn parse_document_index(segment: &str) -> Option<(u64, DocumentEncoding)> {
    let captures = document_index_regex().captures(segment)?;
    let index = captures[1].parse::<u64>().ok()?;
    let encoding = DocumentEncoding::from_extension(&captures[2])?;
    Some((index, encoding))
}

fn check_names(database: &str, collection: &str) -> std::result::Result<(), &'static str> {
    if is_valid_name(database) && is_valid_name(collection) {
        Ok(())
    } else {
        Err(BAD_DB_COLL)
    }
}

// /database
// /currentOp.json, /serverStatus.json, ...
fn parse_one_segment(segments: &[&str]) -> std::result::Result<PathNode, &'static str> {
    let [name] = segments else {
        return Err(UNRECOGNIZED);
    };
    if let Some(diagnostic) = Diagnostic::from_file_name(name) {
        return Ok(PathNode::Diagnostic(diagnostic));
    }
    if !is_valid_name(name) {
        return Err("Invalid database name.");
    }
    Ok(PathNode::Database {
        database: name.to_string(),
    })
}

// /database/collection
fn parse_collection(segments: &[&str]) -> std::result::Result<PathNode, &'static str> {
    let [database, collection] = segments else {
        return Err(UNRECOGNIZED);
    };
    check_names(database, collection)?;
    Ok(PathNode::Collection {
        database: database.to_string(),
        collection: collection.to_string(),
    })
}

// /database/collection
//     /stats.json
//     /indexes.json
//     /data
//     /query
fn parse_collection_entry(segments: &[&str]) -> std::result::Result<PathNode, &'static str> {
    let [database, collection, entry] = segments else {
        return Err(UNRECOGNIZED);
    };
    check_names(database, collection)?;

    let database = database.to_string();
    let collection = collection.to_string();
    match *entry {
        STATS_FILE => Ok(PathNode::Stats {
            database,
            collection,
        }),
        INDEXES_FILE => Ok(PathNode::Indexes {
            database,
            collection,
        }),
        DATA_DIR => Ok(PathNode::DataDir {
            database,
            collection,
        }),
        QUERY_DIR => Ok(PathNode::QueryEmptyDir {
            database,
            collection,
        }),
        _ => Err(UNRECOGNIZED),
    }
}

// /database/collection
//     /data/<index>.(json|bson)
//     /query/<value>
fn parse_four_segments(segments: &[&str]) -> std::result::Result<PathNode, &'static str> {
    let [database, collection, dir, last] = segments else {
        return Err(UNRECOGNIZED);
    };
    check_names(database, collection)?;

    match *dir {
        DATA_DIR => {
            let (index, encoding) = parse_document_index(last).ok_or(UNRECOGNIZED)?;
            Ok(PathNode::DataDocument {
                database: database.to_string(),
                collection: collection.to_string(),
                index,
                encoding,
            })
        }
        QUERY_DIR => Ok(PathNode::QueryDir {
            database: database.to_string(),
            collection: collection.to_string(),
            query: QuerySpec::on_id(*last),
        }),
        _ => Err(UNRECOGNIZED),
    }
}

// /database/collection/query
//     /<value>/<index>.(json|bson)
//     /<value>/all.json
//     /<field>/<value>
fn parse_five_segments(segments: &[&str]) -> std::result::Result<PathNode, &'static str> {
    let [database, collection, dir, fourth, fifth] = segments else {
        return Err(UNRECOGNIZED);
    };
    check_names(database, collection)?;
    if *dir != QUERY_DIR {
        return Err(UNRECOGNIZED);
    }

    let database = database.to_string();
    let collection = collection.to_string();
    if let Some((index, encoding)) = parse_document_index(fifth) {
        return Ok(PathNode::QueryDocument {
            database,
            collection,
            query: QuerySpec::on_id(*fourth),
            index,
            encoding,
        });
    }
    if *fifth == QUERY_ALL_FILE {
        return Ok(PathNode::QueryAll {
            database,
            collection,
            query: QuerySpec::on_id(*fourth),
        });
    }
    if !is_valid_field(fourth) {
        return Err(BAD_FIELD);
    }
    Ok(PathNode::QueryDir {
        database,
        collection,
        query: QuerySpec::new(*fourth, *fifth),
    })
}

// /database/collection/query/<field>
//     /<value>/<index>.(json|bson)
//     /<value>/all.json
fn parse_six_segments(segments: &[&str]) -> std::result::Result<PathNode, &'static str> {
    let [database, collection, dir, field, value, last] = segments else {
        return Err(UNRECOGNIZED);
    };
    check_names(database, collection)?;
    if *dir != QUERY_DIR {
        return Err(UNRECOGNIZED);
    }

    if !is_valid_field(field) {
        return Err(BAD_FIELD);
    }

    let query = QuerySpec::new(*field, *value);
    if let Some((index, encoding)) = parse_document_index(last) {
        return Ok(PathNode::QueryDocument {
            database: database.to_string(),
            collection: collection.to_string(),
            query,
            index,
            encoding,
        });
    }
    if *last == QUERY_ALL_FILE {
        return Ok(PathNode::QueryAll {
            database: database.to_string(),
            collection: collection.to_string(),
            query,
        });
    }
    Err(UNRECOGNIZED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::types::DEFAULT_QUERY_FIELD;
    use pretty_assertions::assert_eq;

    fn parser() -> PathParser {
        PathParser::new('/').unwrap()
    }

    fn db_coll(database: &str, collection: &str) -> (String, String) {
        (database.to_string(), collection.to_string())
    }

    #[test]
    fn test_invalid_inputs() {
        let p = parser();
        assert_eq!(p.parse(""), None);
        assert_eq!(p.parse("something"), None);
        assert_eq!(p.parse("shop/orders"), None);
        assert_eq!(p.parse("/shop.v2"), None);
        assert_eq!(p.parse("/shop/orders.old"), None);
        assert_eq!(p.parse("/shop/orders/nothing"), None);
        assert_eq!(p.parse("/shop/orders/data/x.json"), None);
        assert_eq!(p.parse("/shop/orders/data/1.xml"), None);
        assert_eq!(p.parse("/shop/orders/data/-1.json"), None);
        assert_eq!(p.parse("/shop/orders/data/1.json.bak"), None);
        assert_eq!(p.parse("/shop/orders/stats/42"), None);
        assert_eq!(p.parse("/shop/orders/data/a/b"), None);
        assert_eq!(p.parse("/shop/orders/query/a/b/c"), None);
        assert_eq!(p.parse("/shop/orders/query/a/b/c/d"), None);
    }

    #[test]
    fn test_index_overflow_is_unrecognized() {
        let p = parser();
        assert_eq!(
            p.parse("/shop/orders/data/99999999999999999999999.json"),
            None
        );
    }

    #[test]
    fn test_root_path() {
        let p = parser();
        assert_eq!(p.parse("/"), Some(PathNode::Root));
        assert_eq!(p.parse("//"), Some(PathNode::Root));
    }

    #[test]
    fn test_database_path() {
        let p = parser();
        let expected = Some(PathNode::Database {
            database: "shop".into(),
        });
        assert_eq!(p.parse("/shop"), expected);
        assert_eq!(p.parse("/shop/"), expected);
    }

    #[test]
    fn test_diagnostic_paths() {
        let p = parser();
        for diagnostic in Diagnostic::ALL {
            let path = format!("/{}", diagnostic.file_name());
            assert_eq!(p.parse(&path), Some(PathNode::Diagnostic(diagnostic)));
        }
    }

    #[test]
    fn test_collection_path() {
        let p = parser();
        let (database, collection) = db_coll("shop", "orders");
        let expected = Some(PathNode::Collection {
            database,
            collection,
        });
        assert_eq!(p.parse("/shop/orders"), expected);
        assert_eq!(p.parse("/shop/orders/"), expected);
        assert_eq!(p.parse("/shop//orders"), expected);
    }

    #[test]
    fn test_collection_entries() {
        let p = parser();
        let cases = [
            ("stats.json", "Stats"),
            ("indexes.json", "Indexes"),
            ("data", "DataDir"),
            ("query", "QueryEmptyDir"),
        ];

        for (entry, kind) in cases {
            for path in [
                format!("/shop/orders/{entry}"),
                format!("/shop/orders/{entry}/"),
            ] {
                let node = p.parse(&path).unwrap();
                assert_eq!(node.kind_name(), kind);
                assert_eq!(node.database(), Some("shop"));
                assert_eq!(node.collection(), Some("orders"));
            }
        }
    }

    #[test]
    fn test_data_document_path() {
        let p = parser();
        assert_eq!(
            p.parse("/shop/orders/data/17.json"),
            Some(PathNode::DataDocument {
                database: "shop".into(),
                collection: "orders".into(),
                index: 17,
                encoding: DocumentEncoding::Json,
            })
        );
        assert_eq!(
            p.parse("/shop/orders/data/0.bson"),
            Some(PathNode::DataDocument {
                database: "shop".into(),
                collection: "orders".into(),
                index: 0,
                encoding: DocumentEncoding::Bson,
            })
        );
    }

    #[test]
    fn test_query_directory_path() {
        let p = parser();
        assert_eq!(
            p.parse("/shop/orders/query/42"),
            Some(PathNode::QueryDir {
                database: "shop".into(),
                collection: "orders".into(),
                query: QuerySpec::new(DEFAULT_QUERY_FIELD, "42"),
            })
        );
        assert_eq!(
            p.parse("/shop/orders/query/status/shipped/"),
            Some(PathNode::QueryDir {
                database: "shop".into(),
                collection: "orders".into(),
                query: QuerySpec::new("status", "shipped"),
            })
        );
    }

    #[test]
    fn test_query_document_path() {
        let p = parser();
        assert_eq!(
            p.parse("/shop/orders/query/42/3.json"),
            Some(PathNode::QueryDocument {
                database: "shop".into(),
                collection: "orders".into(),
                query: QuerySpec::on_id("42"),
                index: 3,
                encoding: DocumentEncoding::Json,
            })
        );
        assert_eq!(
            p.parse("/shop/orders/query/status/shipped/1.bson"),
            Some(PathNode::QueryDocument {
                database: "shop".into(),
                collection: "orders".into(),
                query: QuerySpec::new("status", "shipped"),
                index: 1,
                encoding: DocumentEncoding::Bson,
            })
        );
    }

    #[test]
    fn test_query_all_documents_path() {
        let p = parser();
        assert_eq!(
            p.parse("/shop/orders/query/42/all.json"),
            Some(PathNode::QueryAll {
                database: "shop".into(),
                collection: "orders".into(),
                query: QuerySpec::on_id("42"),
            })
        );
        assert_eq!(
            p.parse("/shop/orders/query/status/shipped/all.json"),
            Some(PathNode::QueryAll {
                database: "shop".into(),
                collection: "orders".into(),
                query: QuerySpec::new("status", "shipped"),
            })
        );
    }

    #[test]
    fn test_invalid_names_rejected_at_every_depth() {
        let p = parser();
        assert_eq!(p.parse("/sh.op/orders/data"), None);
        assert_eq!(p.parse("/shop/ord.ers/data/1.json"), None);
        assert_eq!(p.parse("/shop/ord.ers/query/a/b"), None);
        assert_eq!(p.parse("/shop/ord.ers/query/a/b/all.json"), None);
    }

    #[test]
    fn test_operator_fields_rejected() {
        let p = parser();
        assert_eq!(p.parse("/shop/orders/query/$where/sleep(5000)"), None);
        assert_eq!(p.parse("/shop/orders/query/$where/sleep(5000)/all.json"), None);
        assert_eq!(p.parse("/shop/orders/query/$expr/1/0.json"), None);

        // A `$` in value position is only ever compared for equality.
        assert!(matches!(
            p.parse("/shop/orders/query/$where/all.json"),
            Some(PathNode::QueryAll { query, .. }) if query == QuerySpec::on_id("$where")
        ));
        assert!(matches!(
            p.parse("/shop/orders/query/price$/10"),
            Some(PathNode::QueryDir { query, .. }) if query.field == "price$"
        ));
    }

    #[test]
    fn test_alternate_separator() {
        let p = PathParser::new('\\').unwrap();
        assert_eq!(p.separator(), '\\');
        assert_eq!(p.parse("\\"), Some(PathNode::Root));
        assert_eq!(
            p.parse("\\shop\\orders\\data\\2.json"),
            Some(PathNode::DataDocument {
                database: "shop".into(),
                collection: "orders".into(),
                index: 2,
                encoding: DocumentEncoding::Json,
            })
        );
        assert_eq!(p.parse("/shop"), None);
    }

    #[test]
    fn test_duplicate_rule_is_rejected() {
        let mut rules = GRAMMAR.to_vec();
        rules.push(GrammarRule {
            segments: 2,
            name: "shadow",
            parse: parse_collection,
        });
        let err = PathParser::with_rules('/', &rules).err().unwrap();
        assert!(matches!(err, MongoFsError::Grammar(_)));
        assert!(err.to_string().contains("shadow"));
    }

    #[test]
    fn test_segment_counts_without_rule() {
        let p = PathParser::with_rules('/', &GRAMMAR[..2]).unwrap();
        assert_eq!(p.parse("/shop/orders/data"), None);
        assert!(p.parse("/shop/orders").is_some());
    }

    #[test]
    fn test_parse_document_index() {
        assert_eq!(
            parse_document_index("55.json"),
            Some((55, DocumentEncoding::Json))
        );
        assert_eq!(parse_document_index("all.json"), None);
        assert_eq!(parse_document_index("1.JSON"), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any two names without `.` parse to a collection, with or without a trailing separator
        #[test]
        fn prop_collection_roundtrip(
            database in "[A-Za-z0-9_\\-]{1,24}",
            collection in "[A-Za-z0-9_\\- $]{1,24}",
        ) {
            let parser = PathParser::new('/').unwrap();
            let expected = PathNode::Collection {
                database: database.clone(),
                collection: collection.clone(),
            };
            let bare = format!("/{database}/{collection}");
            let trailing = format!("/{database}/{collection}/");
            prop_assert_eq!(parser.parse(&bare), Some(expected.clone()));
            prop_assert_eq!(parser.parse(&trailing), Some(expected));
        }

        /// Arbitrary text never panics the parser
        #[test]
        fn prop_arbitrary_input_does_not_panic(input in "\\PC*") {
            let parser = PathParser::new('/').unwrap();
            let _ = parser.parse(&input);
        }

        /// Path-shaped text never panics and relative paths never parse
        #[test]
        fn prop_path_shaped_input(segments in prop::collection::vec("[a-z0-9.$]{0,6}", 0..9)) {
            let parser = PathParser::new('/').unwrap();
            let relative = segments.join("/");
            let _ = parser.parse(&format!("/{relative}"));
            if !relative.starts_with('/') {
                prop_assert_eq!(parser.parse(&relative), None);
            }
        }

        /// Every `<u64>.<ext>` is accepted with the same index
        #[test]
        fn prop_document_index_accepts_digits(index in any::<u64>(), bson in any::<bool>()) {
            let encoding = if bson { DocumentEncoding::Bson } else { DocumentEncoding::Json };
            let segment = encoding.file_name(index);
            prop_assert_eq!(parse_document_index(&segment), Some((index, encoding)));
        }

        /// Anything accepted has the shape `<digits>.(json|bson)`
        #[test]
        fn prop_document_index_shape(segment in "\\PC{0,12}") {
            if parse_document_index(&segment).is_some() {
                let (stem, ext) = segment.split_once('.').unwrap();
                prop_assert!(!stem.is_empty());
                prop_assert!(stem.bytes().all(|b| b.is_ascii_digit()));
                prop_assert!(ext == "json" || ext == "bson");
            }
        }
    }
}
