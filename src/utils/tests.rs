use super::error::{BrokerError, ProtocolError};
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("not-a-level");
}

#[test]
fn test_protocol_error_messages() {
    assert_eq!(ProtocolError::UnknownRole.to_string(), "unrecognized role");
    assert_eq!(
        ProtocolError::UnknownTransmissionMode.to_string(),
        "unrecognized transmission mode"
    );

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err = ProtocolError::Decode(json_err);
    assert!(err.to_string().starts_with("malformed envelope:"));
}

#[test]
fn test_bind_error_keeps_address() {
    let err = BrokerError::Bind {
        addr: "127.0.0.1:1".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
    };
    assert!(err.to_string().contains("127.0.0.1:1"));
    assert!(std::error::Error::source(&err).is_some());
}
