//! `cronlink-core`: types and rules shared by every cronlink crate.
//!
//! Holds the registry descriptor and schedule candidate models, the cron
//! validator, the descriptor translator, configuration loading, and the two
//! collaborator seams ([`FunctionRegistry`], [`FunctionInvoker`]) the
//! reconciliation loop and the scheduler talk through.

pub mod config;
pub mod error;
pub mod invoke;
pub mod registry;
pub mod schedule;
pub mod translate;
pub mod types;

pub use config::ConnectorConfig;
pub use error::{ConnectorError, Ineligible, RegistryError, Result, ScheduleError};
pub use invoke::FunctionInvoker;
pub use registry::FunctionRegistry;
pub use translate::translate;
pub use types::{CandidateIdentity, FunctionDescriptor, InvocationResult, ScheduleCandidate};
