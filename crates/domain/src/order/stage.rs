//! Factory-local order stage machine.

use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// The stage of an order inside the factory that owns it.
///
/// Stage transitions:
/// ```text
/// WaitingForParts ──► Production ──► Complete ──► Shipped
///     (partsdelivered)    (complete)     (shipped)
/// ```
///
/// Stages only move forward, one step at a time. The status event that
/// causes each step is shown underneath the arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FactoryStage {
    /// Record created, parts ordered.
    #[default]
    WaitingForParts,

    /// Parts delivered, assembly requested.
    Production,

    /// Assembly finished, shipping requested.
    Complete,

    /// Shipped and reported upstream (terminal state).
    Shipped,
}

/// Outcome of applying a status event to a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageTransition {
    /// The event moves the order one stage forward.
    Advance { from: FactoryStage, to: FactoryStage },

    /// The event produced the current stage already (a redelivery).
    Duplicate(FactoryStage),

    /// The event belongs to a different stage than the next one.
    OutOfOrder {
        current: FactoryStage,
        requested: FactoryStage,
    },

    /// The status does not drive the factory stage machine at all.
    NotAStageEvent,
}

impl FactoryStage {
    /// Returns the stage a status event leads to, if it drives the machine.
    pub fn reached_by(status: &OrderStatus) -> Option<FactoryStage> {
        match status {
            OrderStatus::PartsDelivered => Some(FactoryStage::Production),
            OrderStatus::Complete => Some(FactoryStage::Complete),
            OrderStatus::Shipped => Some(FactoryStage::Shipped),
            _ => None,
        }
    }

    /// Returns the stage that directly follows this one.
    pub fn next(&self) -> Option<FactoryStage> {
        match self {
            FactoryStage::WaitingForParts => Some(FactoryStage::Production),
            FactoryStage::Production => Some(FactoryStage::Complete),
            FactoryStage::Complete => Some(FactoryStage::Shipped),
            FactoryStage::Shipped => None,
        }
    }

    /// Decides what a status event means for an order in this stage.
    pub fn apply(&self, status: &OrderStatus) -> StageTransition {
        let Some(requested) = Self::reached_by(status) else {
            return StageTransition::NotAStageEvent;
        };

        if requested == *self {
            StageTransition::Duplicate(*self)
        } else if self.next() == Some(requested) {
            StageTransition::Advance {
                from: *self,
                to: requested,
            }
        } else {
            StageTransition::OutOfOrder {
                current: *self,
                requested,
            }
        }
    }

    /// Returns true if this is a terminal stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FactoryStage::Shipped)
    }

    /// Returns the matching order status.
    pub fn status(&self) -> OrderStatus {
        match self {
            FactoryStage::WaitingForParts => OrderStatus::WaitingForParts,
            FactoryStage::Production => OrderStatus::Production,
            FactoryStage::Complete => OrderStatus::Complete,
            FactoryStage::Shipped => OrderStatus::Shipped,
        }
    }

    /// Returns the stage name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FactoryStage::WaitingForParts => "waitingForParts",
            FactoryStage::Production => "production",
            FactoryStage::Complete => "complete",
            FactoryStage::Shipped => "shipped",
        }
    }
}

impl std::fmt::Display for FactoryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
