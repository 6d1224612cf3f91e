//! Query compiler configuration.

/// Default name of the synthetic column carrying a child row's parent link.
pub const DEFAULT_JOIN_MARKER: &str = "____id____";

/// Default name of the column holding the result of a count query.
pub const DEFAULT_COUNT_COLUMN: &str = "rowCount";

/// How to resolve a to-one reference that matches several parent candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceConflict {
    /// The last match overwrites earlier ones.
    #[default]
    LastMatchWins,
    /// A second, different match fails the query.
    Reject,
}

/// Configuration threaded into a [`QueryCompiler`](crate::QueryCompiler).
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Log every compiled query at `info` and mark contexts as debug.
    pub debug: bool,

    /// Log executor failures at `warn` before returning them.
    pub log_errors: bool,

    /// Synthetic column that carries join keys on subquery rows.
    pub join_marker_column: String,

    /// Column read by `count()`.
    pub count_column: String,

    /// Policy for to-one references with several matches.
    pub reference_conflict: ReferenceConflict,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_errors: false,
            join_marker_column: DEFAULT_JOIN_MARKER.to_string(),
            count_column: DEFAULT_COUNT_COLUMN.to_string(),
            reference_conflict: ReferenceConflict::default(),
        }
    }
}

impl CompilerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable verbose query logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable or disable logging of executor failures.
    pub fn with_error_logging(mut self, log_errors: bool) -> Self {
        self.log_errors = log_errors;
        self
    }

    /// Set the join marker column.
    pub fn with_join_marker(mut self, column: impl Into<String>) -> Self {
        self.join_marker_column = column.into();
        self
    }

    /// Set the count column.
    pub fn with_count_column(mut self, column: impl Into<String>) -> Self {
        self.count_column = column.into();
        self
    }

    /// Set the reference conflict policy.
    pub fn with_reference_conflict(mut self, policy: ReferenceConflict) -> Self {
        self.reference_conflict = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert!(!config.debug);
        assert!(!config.log_errors);
        assert_eq!(config.join_marker_column, DEFAULT_JOIN_MARKER);
        assert_eq!(config.count_column, DEFAULT_COUNT_COLUMN);
        assert_eq!(config.reference_conflict, ReferenceConflict::LastMatchWins);
    }

    #[test]
    fn test_config_builder() {
        let config = CompilerConfig::new()
            .with_debug(true)
            .with_error_logging(true)
            .with_join_marker("__link")
            .with_count_column("n")
            .with_reference_conflict(ReferenceConflict::Reject);

        assert!(config.debug);
        assert!(config.log_errors);
        assert_eq!(config.join_marker_column, "__link");
        assert_eq!(config.count_column, "n");
        assert_eq!(config.reference_conflict, ReferenceConflict::Reject);
    }
}
