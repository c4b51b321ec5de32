//! Single-writer execution context.
//!
//! Every state-mutating operation of the object model is linearized through one
//! dedicated writer thread. Callers on any other thread package their work as a
//! [`Task`], enqueue it, and block on a completion slot until the writer has run
//! it. Callers already on the writer thread run inline, so the writer never
//! blocks on itself.
//!
//! * [`Executor`]: the writer thread plus its task queue
//! * [`Task`]: a named unit of deferred work
//! * [`TaskHandle`]: the caller's side of a completion slot
//! * [`ExecutorStats`]: submission/completion counters

mod completion;
mod config;
mod error;
mod executor;
mod spawn;
mod stats;
mod task;


pub use completion::TaskHandle;
pub use config::ExecutorConfig;
pub use error::ExecutorError;
pub use executor::Executor;
pub use spawn::spawn_named_thread;
pub use stats::{ExecutorStats, ExecutorStatsSnapshot};
pub use task::Task;
