// self
use crate::obs::{Direction, MessageOutcome};

/// Records a message outcome via the global metrics recorder (when enabled).
pub fn record_message_outcome(direction: Direction, outcome: MessageOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth_channel_message_total",
			"direction" => direction.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (direction, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_message_outcome_noop_without_metrics() {
		record_message_outcome(Direction::Incoming, MessageOutcome::Rejected);
	}
}
