use crate::dialect::Dialect;
use std::fmt;
use std::time::Duration;

/// The kind of statement being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// `MERGE` / `ON DUPLICATE KEY` / `ON CONFLICT` statements.
    Upsert,
    /// CREATE, DROP, ALTER and TRUNCATE.
    Ddl,
    Other,
}

fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    sql.get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
        && sql[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_')
}

impl QueryType {
    /// Detect the statement kind from its leading keyword.
    ///
    /// Firebird `EXECUTE BLOCK` statements only ever wrap bulk inserts.
    pub fn from_sql(sql: &str) -> Self {
        let sql = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        let upsert = |sql: &str| {
            let upper = sql.to_ascii_uppercase();
            upper.contains(" ON DUPLICATE KEY UPDATE ") || upper.contains(" ON CONFLICT ")
        };
        if starts_with_keyword(sql, "SELECT") {
            QueryType::Select
        } else if starts_with_keyword(sql, "INSERT") {
            if upsert(sql) {
                QueryType::Upsert
            } else {
                QueryType::Insert
            }
        } else if starts_with_keyword(sql, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(sql, "DELETE") {
            QueryType::Delete
        } else if starts_with_keyword(sql, "MERGE") {
            QueryType::Upsert
        } else if starts_with_keyword(sql, "EXECUTE BLOCK") {
            QueryType::Insert
        } else if ["CREATE", "DROP", "ALTER", "TRUNCATE"]
            .iter()
            .any(|k| starts_with_keyword(sql, k))
        {
            QueryType::Ddl
        } else {
            QueryType::Other
        }
    }
}

/// What a hook sees of a statement about to run.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Rendered SQL, with `@pN` placeholders.
    pub sql: String,
    pub param_count: usize,
    pub query_type: QueryType,
    pub dialect: Dialect,
    /// Optional name identifying the call site.
    pub tag: Option<String>,
}

impl QueryContext {
    pub fn new(sql: &str, param_count: usize, dialect: Dialect) -> Self {
        Self {
            sql: sql.to_string(),
            param_count,
            query_type: QueryType::from_sql(sql),
            dialect,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = query_type;
        self
    }
}

const MAX_ERROR_LEN: usize = 512;

/// Outcome of a statement, as reported to [`QueryHook::after_query`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Rows read from a query.
    Rows(usize),
    /// Rows affected by a command.
    Affected(u64),
    /// A scalar was returned.
    Scalar,
    /// The statement failed (message truncated to 512 bytes).
    Error(String),
}

impl QueryResult {
    pub fn error(msg: String) -> Self {
        if msg.len() <= MAX_ERROR_LEN {
            return Self::Error(msg);
        }
        Self::Error(format!("{}...", super::truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::Scalar => f.write_str("scalar"),
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Action to take after a hook inspected a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum HookAction {
    Continue,
    /// Execute this SQL instead. Placeholders must stay the same.
    ModifySql(String),
    /// Stop; the caller receives `OrmError::Other` with this reason.
    Abort(String),
}

/// Hooks into statement execution.
///
/// Every hook registered on a `Database` sees each statement before it is
/// sent to the executor and again after it completes.
pub trait QueryHook: Send + Sync {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        let _ = ctx;
        HookAction::Continue
    }

    fn after_query(&self, _ctx: &QueryContext, _duration: Duration, _result: &QueryResult) {}
}
