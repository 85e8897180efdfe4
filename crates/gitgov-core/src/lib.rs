// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// The seven payload shapes and the `RecordType` tag.
pub mod payload;
/// The record envelope (`Header` + `Signature` + `Record`).
pub mod record;

pub use payload::{
    ActorKind, ActorPayload, ActorStatus, AgentPayload, ChangelogPayload, CyclePayload, CycleStatus, EngineSpec,
    ExecutionPayload, FeedbackPayload, FeedbackStatus, Payload, RecordType, TaskPayload, TaskPriority, TaskStatus,
};
pub use record::{Header, Record, Signature, PROTOCOL_VERSION};
