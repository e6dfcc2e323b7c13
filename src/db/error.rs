use std::fmt;

/// SQL text plus its named parameters, carried with every failure for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    pub sql: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl QueryContext {
    pub fn new(sql: &'static str) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    /// Record a nullable parameter, rendering NULL for absent values
    pub fn nullable_param<T: fmt::Display>(self, name: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self.param(name, "NULL"),
        }
    }
}

impl fmt::Display for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = self.sql.split_whitespace().collect::<Vec<_>>().join(" ");
        write!(f, "query: [{}] and params: {{", sql)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "}}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Query failed, {context}: {source}")]
    Query {
        context: QueryContext,
        #[source]
        source: sqlx::Error,
    },
    #[error("Unexpected row shape, {context}: {detail}")]
    Shape { context: QueryContext, detail: String },
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),
}

impl DbError {
    /// Wrap a sqlx failure, separating rows that don't decode from executor failures
    pub fn from_sqlx(context: QueryContext, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::Decode(_) => DbError::Shape {
                context,
                detail: err.to_string(),
            },
            source => DbError::Query { context, source },
        }
    }

    pub fn context(&self) -> Option<&QueryContext> {
        match self {
            DbError::Query { context, .. } | DbError::Shape { context, .. } => Some(context),
            DbError::Connect(_) => None,
        }
    }
}
