//! Integration tests for `ScaleSession`: link lifecycle, committing readings, and
//! weight retrieval, all against the scripted mock transport.

use cas_scale::error::ProtocolViolation;
use cas_scale::scale::frame::pack_raw_frame;
use cas_scale::scale::serial_mock::MockTransport;
use cas_scale::{ScaleError, ScaleFrame, ScaleReading, ScaleSession, ScaleStatus, SerialConfig, WeightUnit};
use rust_decimal::Decimal;
use std::io;
use std::str::FromStr;
use tokio_test::{assert_err, assert_ok};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn open_session() -> (MockTransport, ScaleSession<MockTransport>) {
    let mock = MockTransport::new();
    let mut session = ScaleSession::new(mock.clone(), SerialConfig::new("/dev/ttyUSB0"));
    assert!(assert_ok!(session.initialize().await));
    (mock, session)
}

fn unstable_kg() -> ScaleFrame {
    ScaleFrame {
        status: ScaleStatus::Unstable,
        weight: dec("2.5"),
        unit: WeightUnit::Kilograms,
    }
}

#[tokio::test]
async fn test_reading_before_first_exchange() {
    let (_, session) = open_session().await;
    assert_eq!(*session.reading(), ScaleReading::default());
    assert_eq!(session.status(), ScaleStatus::Overload);
    assert_eq!(session.weight(WeightUnit::Grams, 1), dec("0.0"));
}

#[tokio::test]
async fn test_initialize_failure_is_link_error() {
    let mock = MockTransport::new();
    mock.fail_next_opens(1);
    let mut session = ScaleSession::new(mock.clone(), SerialConfig::default());

    let err = assert_err!(session.initialize().await);
    assert!(err.is_link_error());
    assert!(!session.is_open());

    // initialize does not retry on its own; a second call succeeds
    assert!(assert_ok!(session.initialize().await));
}

#[tokio::test]
async fn test_update_commits_reading() {
    let (mock, mut session) = open_session().await;
    mock.queue_reading(&unstable_kg());

    let reading = *assert_ok!(session.update().await);
    assert_eq!(reading.status, ScaleStatus::Unstable);
    assert_eq!(reading.weight, dec("2.5"));
    assert_eq!(reading.unit, WeightUnit::Kilograms);
    assert_eq!(session.weight(WeightUnit::Grams, 1), dec("2500.0"));
}

#[tokio::test]
async fn test_bad_ack_keeps_previous_reading() {
    let (mock, mut session) = open_session().await;
    mock.queue_reading(&unstable_kg());
    assert_ok!(session.update().await);
    let before = *session.reading();

    mock.queue_rx_data(&[0x00]);
    let err = assert_err!(session.update().await);
    assert!(matches!(
        err,
        ScaleError::Protocol(ProtocolViolation::UnexpectedAck { received: Some(0x00) })
    ));
    assert_eq!(*session.reading(), before);
}

#[tokio::test]
async fn test_unknown_unit_commits_nothing() {
    let (mock, mut session) = open_session().await;
    mock.queue_ack();
    mock.queue_rx_data(&pack_raw_frame(0x53, b"+000750", *b"oz"));

    let err = assert_err!(session.update().await);
    assert!(matches!(
        err,
        ScaleError::Protocol(ProtocolViolation::UnknownUnitCode(_))
    ));
    // status and weight decoded fine but must not be committed on their own
    assert_eq!(*session.reading(), ScaleReading::default());
}

#[tokio::test]
async fn test_corrupted_frame_commits_nothing() {
    let (mock, mut session) = open_session().await;
    let mut bytes = pack_raw_frame(0x53, b"+000750", *b" g");
    bytes[8] ^= 0x01;
    mock.queue_ack();
    mock.queue_rx_data(&bytes);

    let err = assert_err!(session.update().await);
    assert!(err.is_protocol_violation());
    assert_eq!(*session.reading(), ScaleReading::default());
}

#[tokio::test]
async fn test_read_error_during_frame_is_link_error() {
    let (mock, mut session) = open_session().await;
    mock.queue_ack();
    mock.set_read_error_after(1, io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));

    let err = assert_err!(session.update().await);
    assert!(err.is_link_error());
    assert!(!err.is_protocol_violation());
    assert_eq!(*session.reading(), ScaleReading::default());
}

#[tokio::test]
async fn test_write_error_is_link_error() {
    let (mock, mut session) = open_session().await;
    mock.set_next_write_error(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));

    let err = assert_err!(session.update().await);
    assert!(matches!(err, ScaleError::SerialPortError(_)));
}

#[tokio::test]
async fn test_reinitialize_reuses_config() {
    let (mock, mut session) = open_session().await;
    session.reinitialize().await;

    assert_eq!(mock.close_count(), 1);
    assert_eq!(mock.open_count(), 2);
    assert_eq!(mock.last_config().unwrap(), SerialConfig::new("/dev/ttyUSB0"));
    assert!(session.is_open());
}

#[tokio::test]
async fn test_reinitialize_when_closed_only_opens() {
    let (mock, mut session) = open_session().await;
    mock.unplug();
    session.reinitialize().await;

    assert_eq!(mock.close_count(), 0);
    assert_eq!(mock.open_count(), 2);
}

#[tokio::test]
async fn test_reinitialize_failure_is_swallowed() {
    let (mock, mut session) = open_session().await;
    mock.fail_next_opens(1);
    session.reinitialize().await;
    assert!(!session.is_open());

    // the next update reveals the dead link
    let err = assert_err!(session.update().await);
    assert!(err.is_link_error());
}

#[tokio::test]
async fn test_weight_in_requested_units() {
    let (mock, mut session) = open_session().await;
    mock.queue_reading(&ScaleFrame {
        status: ScaleStatus::Stable,
        weight: dec("1"),
        unit: WeightUnit::Pounds,
    });
    assert_ok!(session.update().await);

    assert_eq!(session.weight(WeightUnit::Grams, 3), dec("453.595"));
    // 453.595 truncates to 453.5, last digit 5 rounds away
    assert_eq!(session.weight(WeightUnit::Grams, 1), dec("453.6"));
    assert_eq!(session.weight(WeightUnit::Pounds, 2), dec("1.00"));
    assert_eq!(assert_ok!(session.weight_as("kg", 2)), dec("0.46"));
    assert!(matches!(
        session.weight_as("stone", 1),
        Err(ScaleError::UnknownUnit(_))
    ));
}

#[tokio::test]
async fn test_weight_caps_decimal_places() {
    let (mock, mut session) = open_session().await;
    mock.queue_reading(&unstable_kg());
    assert_ok!(session.update().await);

    assert_eq!(
        session.weight(WeightUnit::Kilograms, 40),
        session.weight(WeightUnit::Kilograms, 28)
    );
}
