//! `cronlink-scheduler`: in-process cron engine and the adapter that binds
//! schedule candidates to it.
//!
//! # Overview
//!
//! [`engine::CronEngine`] keeps a table of cron entries and, once started,
//! polls it every second, spawning the job of each entry that has come due.
//! [`adapter::SchedulerAdapter`] wraps the engine for the reconciliation
//! loop: registering a candidate snapshots it into a job that calls the
//! configured [`cronlink_core::FunctionInvoker`].
//!
//! | Operation    | Behaviour                                                 |
//! |--------------|-----------------------------------------------------------|
//! | `register`   | Parse the schedule, add an entry, return its [`EntryId`]  |
//! | `unregister` | Drop the entry; stale handles are ignored                 |
//! | `start`      | Spawn the dispatcher once; later calls do nothing         |

pub mod adapter;
pub mod engine;
pub mod error;
pub mod types;

pub use adapter::{JobScheduler, SchedulerAdapter};
pub use engine::{CronEngine, CronJob};
pub use error::{Result, SchedulerError};
pub use types::EntryId;
