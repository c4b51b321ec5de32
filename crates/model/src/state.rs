//! Runtime states, lifetime policies and lifecycle phases.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Actual or desired runtime state of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
	Uninitialized,
	Active,
	Stopped,
	Quiesced,
	Errored,
	Deleted,
}

impl State {
	/// Wire names, in declaration order.
	pub const NAMES: &'static [&'static str] = &["UNINITIALIZED", "ACTIVE", "STOPPED", "QUIESCED", "ERRORED", "DELETED"];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Uninitialized => "UNINITIALIZED",
			Self::Active => "ACTIVE",
			Self::Stopped => "STOPPED",
			Self::Quiesced => "QUIESCED",
			Self::Errored => "ERRORED",
			Self::Deleted => "DELETED",
		}
	}
}

impl fmt::Display for State {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for State {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"UNINITIALIZED" => Ok(Self::Uninitialized),
			"ACTIVE" => Ok(Self::Active),
			"STOPPED" => Ok(Self::Stopped),
			"QUIESCED" => Ok(Self::Quiesced),
			"ERRORED" => Ok(Self::Errored),
			"DELETED" => Ok(Self::Deleted),
			other => Err(format!("unknown state '{other}'")),
		}
	}
}

/// When an object is removed automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifetimePolicy {
	#[default]
	Permanent,
	DeleteOnConnectionClose,
	DeleteOnSessionEnd,
	DeleteOnNoLinks,
	DeleteOnNoOutboundLinks,
}

impl LifetimePolicy {
	pub const NAMES: &'static [&'static str] = &[
		"PERMANENT",
		"DELETE_ON_CONNECTION_CLOSE",
		"DELETE_ON_SESSION_END",
		"DELETE_ON_NO_LINKS",
		"DELETE_ON_NO_OUTBOUND_LINKS",
	];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Permanent => "PERMANENT",
			Self::DeleteOnConnectionClose => "DELETE_ON_CONNECTION_CLOSE",
			Self::DeleteOnSessionEnd => "DELETE_ON_SESSION_END",
			Self::DeleteOnNoLinks => "DELETE_ON_NO_LINKS",
			Self::DeleteOnNoOutboundLinks => "DELETE_ON_NO_OUTBOUND_LINKS",
		}
	}

	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"PERMANENT" => Some(Self::Permanent),
			"DELETE_ON_CONNECTION_CLOSE" => Some(Self::DeleteOnConnectionClose),
			"DELETE_ON_SESSION_END" => Some(Self::DeleteOnSessionEnd),
			"DELETE_ON_NO_LINKS" => Some(Self::DeleteOnNoLinks),
			"DELETE_ON_NO_OUTBOUND_LINKS" => Some(Self::DeleteOnNoOutboundLinks),
			_ => None,
		}
	}
}

/// Progress of an object through `open()`/`create()`.
///
/// Phases only move forward: `Constructed`, `Resolved`, `Validated`, then
/// `Created` on first-time provisioning, then `Opened`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LifecyclePhase {
	#[default]
	Constructed,
	Resolved,
	Validated,
	Created,
	Opened,
}
