use super::*;
use chrono::TimeZone;

use crate::{domain::Account, protocol::HealthStatus};

#[test]
fn parses_rfc3339_and_naive_forms() {
    let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single();
    assert_eq!(parse("2024-01-02T03:04:05Z"), expected);
    assert_eq!(parse("2024-01-02T04:04:05+01:00"), expected);
    assert_eq!(parse("2024-01-02 03:04:05"), expected);
    assert_eq!(parse("2024-01-02T03:04:05"), expected);
    assert_eq!(parse("yesterday"), None);
}

#[test]
fn malformed_timestamps_do_not_fail_the_account() {
    let raw = serde_json::json!({
        "id": "ACC-0001",
        "holder": "Alice",
        "balance": 1500.5,
        "currency": "EUR",
        "lastUpdated": "2024-13-45 nonsense",
        "transactions": [
            { "type": "credit", "amount": 200, "timestamp": "02/01/2024" },
            { "type": "debit", "amount": 50, "timestamp": 1704067200 },
            { "type": "debit", "amount": 25, "timestamp": "2024-01-01T10:00:00.250Z" }
        ]
    });

    let account: Account = serde_json::from_value(raw).expect("account decodes");

    assert_eq!(account.last_updated, None);
    assert_eq!(account.transactions.len(), 3);
    assert_eq!(account.transactions[0].timestamp, None);
    assert_eq!(account.transactions[1].timestamp, None);
    assert!(account.transactions[2].timestamp.is_some());
}

#[test]
fn health_tolerates_missing_or_odd_timestamp() {
    let health: HealthStatus =
        serde_json::from_value(serde_json::json!({ "status": "ok", "service": "api" }))
            .expect("health decodes");
    assert_eq!(health.timestamp, None);

    let health: HealthStatus = serde_json::from_value(serde_json::json!({
        "status": "ok",
        "service": "api",
        "timestamp": "soon"
    }))
    .expect("health decodes");
    assert_eq!(health.timestamp, None);
}

#[test]
fn serializes_as_rfc3339_string() {
    let health = HealthStatus {
        status: "ok".into(),
        service: "api".into(),
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
    };
    let value = serde_json::to_value(&health).expect("serialize");
    assert_eq!(value["timestamp"], "2024-01-01T00:00:00+00:00");
}
