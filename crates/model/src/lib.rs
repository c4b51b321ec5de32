//! Typed, hierarchical configured-object model.
//!
//! Every managed entity (broker, virtual host, queue, ...) is a
//! [`ConfiguredObject`]: an identified node with declared attributes, parents
//! and children, living in a [`Model`].
//!
//! * [`meta`]: static type declarations merged into cached descriptor tables
//! * [`CategoryGraph`]: which categories may parent which
//! * [`ConfiguredObject`]: reads, lifecycle, CAS mutation, deletion, records
//! * [`ValidationView`]: a proposed change, readable like the live object
//! * [`broker`]: the built-in broker type set
//!
//! # Threading
//!
//! Reads are safe from any thread. Every mutation of every object in a model
//! runs on that model's single writer thread (see [`keel_worker::Executor`]);
//! callers elsewhere block until their task has run, and receive its result or
//! its error unchanged.

pub mod broker;
mod category;
mod config;
mod context;
mod error;
mod hierarchy;
mod id;
pub mod meta;
mod model;
mod object;
mod security;
mod state;
mod value;
mod view;

pub use category::{Category, CategoryGraph};
pub use config::ModelConfig;
pub use context::{interpolate, interpolate_strict};
pub use error::{ConfigError, ConfigLoadError, MetaError, ModelError, ValueError};
pub use hierarchy::Reachability;
pub use id::ObjectId;
pub use keel_worker::{ExecutorConfig, ExecutorError, ExecutorStatsSnapshot};
pub use model::Model;
pub use object::{CONFIGURED_OBJECT, ChangeListener, ConfiguredObject, ObjectBehavior, ObjectRecord};
pub use security::Subject;
pub use state::{LifecyclePhase, LifetimePolicy, State};
pub use value::{AttrValue, ConvertContext, PlainContext, ValueType};
pub use view::{AttributeSource, ValidationView};
