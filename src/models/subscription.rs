use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Subscription Verify Request
///
/// Both fields are required; they are optional here so that absence maps to a
/// 400 instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub purchase_token: Option<String>,
}

/// Subscription purchase record as returned by the Google Play Developer API.
///
/// Only the fields the verifier inspects are typed; everything else is kept in
/// `extra` so the record serializes back without loss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPurchase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledgement_state: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_state: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time_millis: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SubscriptionPurchase {
    /// Payment received for the current billing period.
    pub const PAYMENT_STATE_RECEIVED: i64 = 1;

    /// The purchase has not been acknowledged yet and would be auto-refunded
    /// if left that way past the grace period.
    pub fn needs_acknowledgement(&self) -> bool {
        self.acknowledgement_state == Some(0)
    }

    /// Expiry timestamp in epoch milliseconds, if present and numeric.
    pub fn expiry_millis(&self) -> Option<i64> {
        self.expiry_time_millis
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
    }

    /// Active iff payment was received and the expiry lies strictly in the
    /// future relative to `now_millis`.
    pub fn is_active_at(&self, now_millis: i64) -> bool {
        self.payment_state == Some(Self::PAYMENT_STATE_RECEIVED)
            && self.expiry_millis().is_some_and(|expiry| expiry > now_millis)
    }
}

/// Subscription Verify Response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_active: bool,
    pub acknowledge: bool,
    /// `null` when the provider record carries no expiry.
    pub expiry_time: Option<i64>,
    pub raw: SubscriptionPurchase,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(payment_state: Option<i64>, expiry_time_millis: Option<&str>) -> SubscriptionPurchase {
        SubscriptionPurchase {
            acknowledgement_state: Some(1),
            payment_state,
            expiry_time_millis: expiry_time_millis.map(str::to_string),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_active_when_paid_and_unexpired() {
        let now = 1_700_000_000_000;
        assert!(record(Some(1), Some("1700000000001")).is_active_at(now));
    }

    #[test]
    fn test_inactive_when_expiry_not_strictly_greater() {
        let now = 1_700_000_000_000;
        assert!(!record(Some(1), Some("1700000000000")).is_active_at(now));
        assert!(!record(Some(1), Some("1699999999999")).is_active_at(now));
    }

    #[test]
    fn test_inactive_without_payment_received() {
        let now = 1_700_000_000_000;
        assert!(!record(Some(0), Some("1700000000001")).is_active_at(now));
        assert!(!record(None, Some("1700000000001")).is_active_at(now));
    }

    #[test]
    fn test_inactive_without_expiry() {
        let now = 1_700_000_000_000;
        assert!(!record(Some(1), None).is_active_at(now));
        assert!(!record(Some(1), Some("not-a-number")).is_active_at(now));
    }

    #[test]
    fn test_needs_acknowledgement_only_for_state_zero() {
        let mut purchase = record(Some(1), None);
        purchase.acknowledgement_state = Some(0);
        assert!(purchase.needs_acknowledgement());

        purchase.acknowledgement_state = Some(1);
        assert!(!purchase.needs_acknowledgement());

        purchase.acknowledgement_state = None;
        assert!(!purchase.needs_acknowledgement());
    }

    #[test]
    fn test_record_round_trips_unknown_fields() {
        let body = json!({
            "acknowledgementState": 1,
            "paymentState": 1,
            "expiryTimeMillis": "1700000000000",
            "kind": "androidpublisher#subscriptionPurchase",
            "orderId": "GPA.1234-5678",
            "autoRenewing": true,
            "priceAmountMicros": "4990000"
        });

        let purchase: SubscriptionPurchase = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(purchase.extra.get("orderId"), Some(&json!("GPA.1234-5678")));
        assert_eq!(serde_json::to_value(&purchase).unwrap(), body);
    }
}
