//! Optional observability helpers for channel traffic.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth_channel.message` with the
//!   `direction` and `mode` fields, a `debug!` event per element, and a `warn!` event for every
//!   rejection.
//! - Enable `metrics` to increment the `oauth_channel_message_total` counter for every
//!   attempt/success/rejection/failure, labeled by `direction` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Direction a message travels through a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
	/// [`crate::channel::Channel::send`].
	Outgoing,
	/// [`crate::channel::Channel::receive`].
	Incoming,
}
impl Direction {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Direction::Outgoing => "outgoing",
			Direction::Incoming => "incoming",
		}
	}
}
impl Display for Direction {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageOutcome {
	/// Message entered the channel.
	Attempt,
	/// Message passed every element.
	Success,
	/// A binding element refused the message.
	Rejected,
	/// Infrastructure or configuration failure unrelated to message trust.
	Failure,
}
impl MessageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			MessageOutcome::Attempt => "attempt",
			MessageOutcome::Success => "success",
			MessageOutcome::Rejected => "rejected",
			MessageOutcome::Failure => "failure",
		}
	}

	/// Classifies a finished channel call.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => MessageOutcome::Success,
			Err(e) if e.is_rejection() => MessageOutcome::Rejected,
			Err(_) => MessageOutcome::Failure,
		}
	}
}
impl Display for MessageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcomes_separate_rejections_from_failures() {
		let rejected: Result<()> = Err(Rejection::InvalidSignature.into());
		let failed: Result<()> =
			Err(Error::Storage(crate::store::StoreError::Backend { message: "down".into() }));

		assert_eq!(MessageOutcome::of(&Ok::<_, Error>(())), MessageOutcome::Success);
		assert_eq!(MessageOutcome::of(&rejected), MessageOutcome::Rejected);
		assert_eq!(MessageOutcome::of(&failed), MessageOutcome::Failure);
	}
}
