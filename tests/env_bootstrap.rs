//! Startup level from the environment.
//!
//! Kept in its own test binary: it mutates the process environment and
//! initializes the process-wide collector.

use querylog::{log, LogCollector, SeverityLevel, LEVEL_ENV_VAR};

#[test]
fn test_level_bootstrap_from_environment() {
    std::env::remove_var(LEVEL_ENV_VAR);
    assert_eq!(LogCollector::from_env().level(), SeverityLevel::Warn);

    std::env::set_var(LEVEL_ENV_VAR, "LOUD");
    assert_eq!(LogCollector::from_env().level(), SeverityLevel::Warn);

    std::env::set_var(LEVEL_ENV_VAR, "INFO");
    assert_eq!(LogCollector::from_env().level(), SeverityLevel::Info);

    // The shared collector reads the variable once, on first use.
    std::env::set_var(LEVEL_ENV_VAR, "TRACE");
    assert_eq!(log().level(), SeverityLevel::Trace);
    std::env::set_var(LEVEL_ENV_VAR, "ERROR");
    assert_eq!(log().level(), SeverityLevel::Trace);
    assert!(std::ptr::eq(log(), log()));
}
