//! Integration tests for the polling loop's connect / skip / recover policy.

use cas_scale::scale::serial_mock::MockTransport;
use cas_scale::{
    LinkState, PollOutcome, Poller, PollerConfig, ScaleFrame, ScaleSession, ScaleStatus,
    SerialConfig, WeightUnit,
};
use rust_decimal::Decimal;
use std::io;
use std::str::FromStr;
use std::time::Duration;

fn fast_config() -> PollerConfig {
    PollerConfig {
        retry_delay: Duration::ZERO,
        recovery_delay: Duration::ZERO,
        ..PollerConfig::default()
    }
}

fn poller(mock: &MockTransport, config: PollerConfig) -> Poller<MockTransport> {
    Poller::new(
        ScaleSession::new(mock.clone(), SerialConfig::default()),
        config,
    )
}

fn stable(weight: &str, unit: WeightUnit) -> ScaleFrame {
    ScaleFrame {
        status: ScaleStatus::Stable,
        weight: Decimal::from_str(weight).unwrap(),
        unit,
    }
}

#[tokio::test]
async fn test_starts_disconnected_and_connects() {
    let mock = MockTransport::new();
    let mut poller = poller(&mock, fast_config());
    assert_eq!(poller.state(), LinkState::Disconnected);

    let outcome = poller.cycle().await;
    assert!(matches!(outcome, PollOutcome::Connected));
    assert_eq!(poller.state(), LinkState::Connected);
}

#[tokio::test]
async fn test_connect_retries_until_open() {
    let mock = MockTransport::new();
    mock.fail_next_opens(3);
    let mut poller = poller(&mock, fast_config());

    poller.connect().await;
    assert_eq!(poller.state(), LinkState::Connected);
    assert_eq!(poller.stats().connect_attempts, 4);
    assert_eq!(mock.open_count(), 1);
}

#[tokio::test]
async fn test_failed_connect_stays_disconnected() {
    let mock = MockTransport::new();
    mock.fail_next_opens(1);
    let mut poller = poller(&mock, fast_config());

    let outcome = poller.cycle().await;
    assert!(matches!(outcome, PollOutcome::ConnectFailed(Some(ref e)) if e.is_link_error()));
    assert_eq!(poller.state(), LinkState::Disconnected);
}

#[tokio::test]
async fn test_reading_reported_in_configured_unit() {
    let mock = MockTransport::new();
    let config = PollerConfig {
        unit: WeightUnit::Kilograms,
        decimal_places: 2,
        ..fast_config()
    };
    let mut poller = poller(&mock, config);
    poller.connect().await;

    mock.queue_reading(&stable("1234", WeightUnit::Grams));
    match poller.cycle().await {
        PollOutcome::Reading(report) => {
            assert_eq!(report.weight, Decimal::from_str("1.23").unwrap());
            assert_eq!(report.unit, WeightUnit::Kilograms);
            assert_eq!(report.status, ScaleStatus::Stable);
            assert_eq!(report.to_string(), "1.23 kg Stable");
        }
        other => panic!("expected a reading, got {other:?}"),
    }
}

#[tokio::test]
async fn test_protocol_violation_skips_cycle() {
    let mock = MockTransport::new();
    let mut poller = poller(&mock, fast_config());
    poller.connect().await;

    mock.queue_reading(&stable("100", WeightUnit::Grams));
    poller.cycle().await;

    // no ACK at all: the read times out empty
    let outcome = poller.cycle().await;
    assert!(matches!(outcome, PollOutcome::Skipped(_)));
    assert_eq!(poller.state(), LinkState::Connected);
    assert_eq!(poller.session().reading().weight, Decimal::from(100));
    assert_eq!(mock.open_count(), 1);
    assert_eq!(mock.close_count(), 0);

    mock.queue_reading(&stable("200", WeightUnit::Grams));
    assert!(matches!(poller.cycle().await, PollOutcome::Reading(_)));

    let stats = poller.stats();
    assert_eq!(stats.readings, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.recoveries, 0);
}

#[tokio::test]
async fn test_link_error_reinitializes_and_resumes() {
    let mock = MockTransport::new();
    let mut poller = poller(&mock, fast_config());
    poller.connect().await;

    mock.queue_ack();
    mock.set_read_error_after(1, io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
    let outcome = poller.cycle().await;
    assert!(matches!(outcome, PollOutcome::LinkLost(ref e) if e.is_link_error()));

    // reopened with the same configuration and still polling
    assert_eq!(mock.close_count(), 1);
    assert_eq!(mock.open_count(), 2);
    assert_eq!(poller.state(), LinkState::Connected);
    assert_eq!(poller.stats().recoveries, 1);

    mock.queue_reading(&stable("42", WeightUnit::Grams));
    assert!(matches!(poller.cycle().await, PollOutcome::Reading(_)));
}

#[tokio::test]
async fn test_failed_recovery_is_retried_on_next_link_error() {
    let mock = MockTransport::new();
    let mut poller = poller(&mock, fast_config());
    poller.connect().await;

    mock.set_next_write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
    mock.fail_next_opens(1);
    assert!(matches!(poller.cycle().await, PollOutcome::LinkLost(_)));
    assert_eq!(poller.state(), LinkState::Connected);

    // the port stayed closed, so the next poll fails on the link again
    assert!(matches!(poller.cycle().await, PollOutcome::LinkLost(_)));
    assert_eq!(mock.open_count(), 2);

    mock.queue_reading(&stable("7", WeightUnit::Grams));
    assert!(matches!(poller.cycle().await, PollOutcome::Reading(_)));
}

#[tokio::test]
async fn test_run_hands_readings_to_callback() {
    let mock = MockTransport::new();
    let config = PollerConfig {
        retry_delay: Duration::from_millis(1),
        recovery_delay: Duration::from_millis(1),
        ..PollerConfig::default()
    };
    let mut poller = poller(&mock, config);
    mock.queue_reading(&stable("10", WeightUnit::Grams));
    mock.queue_reading(&stable("20", WeightUnit::Grams));

    let mut reports = Vec::new();
    let _ = tokio::time::timeout(
        Duration::from_millis(200),
        poller.run(|report| reports.push(*report)),
    )
    .await;

    let weights: Vec<Decimal> = reports.iter().map(|r| r.weight).collect();
    assert_eq!(
        weights,
        vec![Decimal::from_str("10.0").unwrap(), Decimal::from_str("20.0").unwrap()]
    );
}
