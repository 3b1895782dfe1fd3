use tracing::Level;
use vandebron_green::config::LoggingConfig;
use vandebron_green::logging::{
    LogContext, get_logger_with_context, init_logging, min_level, parse_log_level,
};

#[test]
fn level_names_parse_case_insensitively() {
    assert_eq!(parse_log_level("warning").unwrap(), Level::WARN);
    assert_eq!(parse_log_level(" Error ").unwrap(), Level::ERROR);
    assert!(parse_log_level("loud").is_err());
    assert_eq!(min_level(Level::WARN, Level::TRACE), Level::TRACE);
}

#[test]
fn init_is_idempotent() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let cfg = LoggingConfig {
        file: tmp_dir
            .path()
            .join("vandebron.log")
            .to_string_lossy()
            .into_owned(),
        console_output: false,
        ..LoggingConfig::default()
    };

    init_logging(&cfg).unwrap();
    init_logging(&cfg).unwrap();

    let logger = get_logger_with_context(
        LogContext::new("coordinator").with_entry_id("entry-1".to_string()),
    );
    logger.info("logging initialised");
}
