// ai4kali-core/src/lib.rs

//! Turns a plain-language request into one vetted shell command.
//!
//! A request flows through [`prompt`], a [`client::ModelClient`], [`normalize`],
//! [`safety`] and finally the execution gate driven by [`assistant::Assistant`].
//! Terminal rendering and argument parsing are left to the caller through the
//! [`gate::UserInteraction`] and [`exec::CommandRunner`] seams.

pub mod assistant;
pub mod client;
pub mod config;
pub mod errors;
pub mod exec;
pub mod gate;
pub mod normalize;
pub mod prompt;
pub mod providers;
pub mod safety;


pub use assistant::{Assistant, Request};
pub use client::ModelClient;
pub use config::{BackendKind, Config, ShapePolicy};
pub use errors::{GateError, ModelError};
pub use exec::{CommandRunner, ShellRunner};
pub use gate::{
    AbortReason, Confirmation, ExecutionOutcome, GateState, Notice, TurnOptions, TurnReport,
    UserInteraction,
};
pub use safety::{Classification, SafetyClassifier};

pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
