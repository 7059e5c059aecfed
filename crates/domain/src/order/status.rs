//! Order status as carried on the wire and mirrored by Order Intake.

use serde::{Deserialize, Serialize};

/// Status of an order as seen anywhere in the saga.
///
/// Status flow:
/// ```text
/// processing ──► waitingForParts ──► (partsdelivered) ──► production
///            ──► complete ──► shipped
/// ```
///
/// `partsdelivered` is only ever an event; the factory folds it into
/// `production`. Strings that are not part of the protocol are kept
/// verbatim in `Unrecognized` so a message survives decode/encode unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    /// Accepted by Order Intake, not yet assigned to a site.
    #[default]
    Processing,

    /// Recorded at a factory, parts have been ordered.
    WaitingForParts,

    /// Parts Sourcing has resolved every part.
    PartsDelivered,

    /// Parts are in, the order is being assembled.
    Production,

    /// Assembly has finished.
    Complete,

    /// Shipping has dispatched the order (terminal state).
    Shipped,

    /// A status string outside the protocol.
    Unrecognized(String),
}

impl OrderStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::WaitingForParts => "waitingForParts",
            OrderStatus::PartsDelivered => "partsdelivered",
            OrderStatus::Production => "production",
            OrderStatus::Complete => "complete",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Unrecognized(other) => other,
        }
    }

    /// Returns true if the status is part of the protocol.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, OrderStatus::Unrecognized(_))
    }

    /// Returns true if no further transitions are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s {
            "processing" => OrderStatus::Processing,
            "waitingForParts" => OrderStatus::WaitingForParts,
            "partsdelivered" => OrderStatus::PartsDelivered,
            "production" => OrderStatus::Production,
            "complete" => OrderStatus::Complete,
            "shipped" => OrderStatus::Shipped,
            other => OrderStatus::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match OrderStatus::from(s.as_str()) {
            OrderStatus::Unrecognized(_) => OrderStatus::Unrecognized(s),
            known => known,
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Unrecognized(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: [OrderStatus; 6] = [
        OrderStatus::Processing,
        OrderStatus::WaitingForParts,
        OrderStatus::PartsDelivered,
        OrderStatus::Production,
        OrderStatus::Complete,
        OrderStatus::Shipped,
    ];

    #[test]
    fn test_default_status_is_processing() {
        assert_eq!(OrderStatus::default(), OrderStatus::Processing);
    }

    #[test]
    fn test_known_statuses_parse_from_their_wire_names() {
        for status in KNOWN {
            assert_eq!(OrderStatus::from(status.as_str()), status);
            assert!(status.is_recognized());
        }
    }

    #[test]
    fn test_wire_names_are_case_sensitive() {
        assert_eq!(
            OrderStatus::from("Shipped"),
            OrderStatus::Unrecognized("Shipped".into())
        );
        assert_eq!(
            OrderStatus::from("waitingforparts"),
            OrderStatus::Unrecognized("waitingforparts".into())
        );
    }

    #[test]
    fn test_unrecognized_status_keeps_original_text() {
        let status = OrderStatus::from("lost-in-transit");
        assert!(!status.is_recognized());
        assert_eq!(status.to_string(), "lost-in-transit");
        assert_eq!(String::from(status), "lost-in-transit");
    }

    #[test]
    fn test_only_shipped_is_terminal() {
        for status in KNOWN {
            assert_eq!(status.is_terminal(), status == OrderStatus::Shipped);
        }
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&OrderStatus::WaitingForParts).unwrap();
        assert_eq!(json, "\"waitingForParts\"");

        let unknown: OrderStatus = serde_json::from_str("\"teleported\"").unwrap();
        assert_eq!(unknown, OrderStatus::Unrecognized("teleported".into()));
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"teleported\"");
    }
}
