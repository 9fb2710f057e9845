// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chronobot engine: polling, dispatch, outbound delivery and scheduling.
//!
//! [`RunLoop`] owns one [`Poller`], one [`Dispatcher`] and one
//! [`Scheduler`] and drives them sequentially on a single task. Every
//! outbound message, whether a reply, a broadcast or a scheduled job, goes
//! through the shared [`OutboundSender`].

pub mod commands;
pub mod dispatcher;
pub mod metrics;
pub mod outbound;
pub mod poller;
pub mod run_loop;
pub mod scheduler;
pub mod shutdown;

pub use commands::{Classified, Command};
pub use dispatcher::{BroadcastReport, DispatchOutcome, Dispatcher};
pub use outbound::{OutboundSender, SendOutcome};
pub use poller::{PollOutcome, Poller, RetryPolicy};
pub use run_loop::{Clock, IterationReport, RunLoop, RunLoopSettings, RunState, local_clock};
pub use scheduler::{
    JobAction, JobId, JobSpec, JobTarget, ScheduledJob, Scheduler, TickReport, Trigger,
    jobs_from_config,
};
pub use shutdown::install_signal_handler;
