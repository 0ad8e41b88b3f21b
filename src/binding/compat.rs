//! Field renames between protocol revisions.

// self
use crate::{
	_prelude::*,
	binding::{BindingElement, Disposition, ElementRole},
	message::{Message, ProtocolVersion, field},
};

/// Translates the 2.0 field vocabulary to and from legacy (1.x) messages.
///
/// Legacy messages name the requesting realm `trust_root`; the rest of the pipeline and the
/// application only ever see `realm`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BackwardCompatibilityElement;
impl BackwardCompatibilityElement {
	const RENAMES: [(&'static str, &'static str); 1] = [(field::REALM, field::TRUST_ROOT)];
}
impl BindingElement for BackwardCompatibilityElement {
	fn name(&self) -> &'static str {
		"backward_compatibility"
	}

	fn role(&self) -> ElementRole {
		ElementRole::Transform
	}

	fn prepare_outgoing(&self, message: &mut Message) -> Result<Disposition> {
		if message.version() != ProtocolVersion::V1 {
			return Ok(Disposition::NotApplicable);
		}

		for (current, legacy) in Self::RENAMES {
			rename(message, current, legacy);
		}

		Ok(Disposition::Applied)
	}

	fn process_incoming(&self, message: &mut Message) -> Result<Disposition> {
		if message.version() != ProtocolVersion::V1 {
			return Ok(Disposition::NotApplicable);
		}

		for (current, legacy) in Self::RENAMES {
			rename(message, legacy, current);
		}

		Ok(Disposition::Applied)
	}
}

fn rename(message: &mut Message, from: &str, to: &str) {
	if let Some(value) = message.remove(from) {
		message.set(to, value);
	}
}
