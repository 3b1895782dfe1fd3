use tracing::{debug, error, info, warn};

/// Context information for log messages
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Component name (e.g., "api", "coordinator", "web")
    pub component: String,
    /// Config entry the component works for
    pub entry_id: Option<String>,
    /// Additional context fields
    pub extra_fields: std::collections::BTreeMap<String, String>,
}

impl LogContext {
    /// Create a new log context
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            entry_id: None,
            extra_fields: std::collections::BTreeMap::new(),
        }
    }

    /// Set config entry id
    pub fn with_entry_id(mut self, entry_id: String) -> Self {
        self.entry_id = Some(entry_id);
        self
    }

    /// Add extra field
    pub fn with_field(mut self, key: &str, value: String) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }
}

/// Structured logger with context
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    pub(crate) context: LogContext,
}

impl StructuredLogger {
    /// Create a new structured logger with context
    pub fn new(context: LogContext) -> Self {
        Self { context }
    }

    /// Log an info message with context
    pub fn info(&self, message: &str) {
        let fields = self.format_fields();
        info!(%fields, "{}", message);
    }
    /// Log a warning message with context
    pub fn warn(&self, message: &str) {
        let fields = self.format_fields();
        warn!(%fields, "{}", message);
    }
    /// Log an error message with context
    pub fn error(&self, message: &str) {
        let fields = self.format_fields();
        error!(%fields, "{}", message);
    }
    /// Log a debug message with context
    pub fn debug(&self, message: &str) {
        let fields = self.format_fields();
        debug!(%fields, "{}", message);
    }

    /// Format context fields for logging
    pub(crate) fn format_fields(&self) -> String {
        let mut fields = vec![format!("component={}", self.context.component)];
        if let Some(ref entry_id) = self.context.entry_id {
            fields.push(format!("entry_id={}", entry_id));
        }
        for (key, value) in &self.context.extra_fields {
            fields.push(format!("{}={}", key, value));
        }
        fields.join(",")
    }
}

/// Create a logger for a specific component
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}
/// Create a logger with full context
pub fn get_logger_with_context(context: LogContext) -> StructuredLogger {
    StructuredLogger::new(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_fields() {
        let logger = get_logger_with_context(
            LogContext::new("coordinator")
                .with_entry_id("abc".to_string())
                .with_field("day_offset", "3".to_string()),
        );
        assert_eq!(
            logger.format_fields(),
            "component=coordinator,entry_id=abc,day_offset=3"
        );
    }

    #[test]
    fn test_get_logger() {
        let logger = get_logger("api");
        assert_eq!(logger.context.component, "api");
        assert!(logger.context.entry_id.is_none());
    }
}
