//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (REST handlers,
//! messaging callbacks, the keyboard simulator) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.
//! Routers parse their transport into an [`AppCommand`] and render the
//! [`CommandReply`] back; none of them touch the store directly.

use serde::Serialize;

use crate::adapters::analytics::{DisposalRecord, DisposalTotals};
use crate::error::CoreError;
use crate::fsm::context::{Classification, SystemSnapshot};
use crate::sensors::{BinColor, SensorId};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Read the current snapshot.
    GetStatus,

    /// Manual equivalent of a physical sensor edge.
    TriggerSensor(SensorId),

    /// Result from an external classifier.
    SubmitClassification { bin_color: BinColor, confidence: f32 },

    /// Force `manual_reset` from any phase.
    Reset,

    /// Most recent classification seen by the analytics hook.
    LastClassification,

    /// Most recent completed disposal.
    LastDisposal,
}

/// What a command produced.  Serialises to the JSON body front-ends send.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandReply {
    Status {
        state: SystemSnapshot,
    },
    /// The command's event was applied.
    Accepted {
        state: SystemSnapshot,
    },
    /// The command's event was refused; state is unchanged.
    Rejected {
        reason: RejectReason,
        state: SystemSnapshot,
    },
    Classification {
        classification: Option<Classification>,
    },
    Disposal {
        disposal: Option<DisposalRecord>,
        totals: DisposalTotals,
    },
}

impl CommandReply {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Serialisable form of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidTransition,
    StaleEvent,
    ClassificationFailure,
    InvalidPayload,
}

impl From<&CoreError> for RejectReason {
    fn from(e: &CoreError) -> Self {
        match e {
            CoreError::InvalidTransition { .. } => Self::InvalidTransition,
            CoreError::StaleEvent { .. } => Self::StaleEvent,
            CoreError::ClassificationFailure(_) => Self::ClassificationFailure,
            CoreError::InvalidPayload(_) => Self::InvalidPayload,
        }
    }
}
