//! Per-query execution requests.

use std::fmt;

use serde::Serialize;

use crate::query::{Query, QueryMode};

/// Connection class a query should run on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Pool {
    /// Read replicas.
    Read,
    /// Primary / writable connections.
    Write,
    /// An explicitly named pool.
    Named(String),
}

impl Pool {
    /// Pick the pool for a query.
    ///
    /// An explicit, non-empty name wins. Otherwise selections read from the
    /// read pool and everything else goes to the write pool.
    pub fn select(explicit: Option<&str>, mode: QueryMode) -> Self {
        match explicit {
            Some(name) if !name.is_empty() => Pool::Named(name.to_string()),
            _ if mode.is_select() => Pool::Read,
            _ => Pool::Write,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Pool::Read => "read",
            Pool::Write => "write",
            Pool::Named(name) => name,
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Pool> for String {
    fn from(pool: Pool) -> Self {
        pool.name().to_string()
    }
}

/// One physical query as handed to an executor.
///
/// Created fresh for every query and consumed by the executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryContext {
    /// The compiled query.
    pub query: Query,
    /// Target pool.
    pub pool: Pool,
    /// Executor-side debug output.
    pub debug: bool,
    /// Opaque wait flag, passed through to the executor.
    pub wait: bool,
}

impl QueryContext {
    /// Create a context with debug and wait disabled.
    pub fn new(query: Query, pool: Pool) -> Self {
        Self {
            query,
            pool,
            debug: false,
            wait: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn mode(&self) -> QueryMode {
        self.query.mode
    }
}
