//! Global logging setup.
//!
//! Kept in its own test binary: installing a subscriber is process-wide, so
//! no other test may run in this process first.

#![allow(clippy::unwrap_used)]

use apkg_bridge::observability::{self, LogFormat, LoggingConfig};

#[test]
fn test_init_installs_once() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("logs").join("bridge.log");
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_file(log.clone());

    assert!(observability::init(config).is_ok());
    assert!(log.is_file());
    assert!(observability::init(LoggingConfig::default()).is_err());
}
