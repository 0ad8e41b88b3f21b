// self
use crate::{_prelude::*, binding::Disposition, message::MessageMode, obs::Direction};

/// A span wrapping one message's trip through a channel.
#[derive(Clone, Debug)]
pub struct MessageSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl MessageSpan {
	/// Creates a new span tagged with the direction and message mode.
	pub fn new(direction: Direction, mode: MessageMode) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"oauth_channel.message",
				direction = direction.as_str(),
				mode = mode.as_str()
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (direction, mode);

			Self {}
		}
	}

	/// Enters the span for the duration of the returned guard.
	pub fn entered(self) -> MessageSpanGuard {
		#[cfg(feature = "tracing")]
		{
			MessageSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			MessageSpanGuard {}
		}
	}
}

/// RAII guard returned by [`MessageSpan::entered`].
pub struct MessageSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for MessageSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("MessageSpanGuard(..)")
	}
}

/// Emits the disposition an element reported.
pub fn trace_element(element: &'static str, disposition: Disposition) {
	#[cfg(feature = "tracing")]
	tracing::debug!(element, disposition = disposition.as_str(), "binding element finished");

	#[cfg(not(feature = "tracing"))]
	let _ = (element, disposition);
}

/// Emits the error that stopped a message at `element`.
pub fn trace_refusal(element: &'static str, error: &Error) {
	#[cfg(feature = "tracing")]
	match error.rejection() {
		Some(rejection) =>
			tracing::warn!(element, reason = rejection.as_str(), "message rejected: {rejection}"),
		None => tracing::error!(element, "message processing failed: {error}"),
	}

	#[cfg(not(feature = "tracing"))]
	let _ = (element, error);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn message_span_noop_without_tracing() {
		let _guard =
			MessageSpan::new(Direction::Outgoing, MessageMode::AuthenticationRequest).entered();

		trace_element("signing", Disposition::Applied);
		trace_refusal("signing", &Rejection::InvalidSignature.into());
	}
}
