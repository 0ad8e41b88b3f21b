//! Placeholder that stands in for every security element in preview channels.

// self
use crate::{
	_prelude::*,
	binding::{BindingElement, Disposition, ElementRole},
	message::Message,
};

/// Accepts every message without checking anything.
///
/// Only [`crate::channel::ChannelFactory::non_verifying`] can build one, and
/// [`crate::channel::Channel::new`] refuses to combine it with security elements.
#[derive(Debug)]
pub struct SkipSecurityElement {
	_private: (),
}
impl SkipSecurityElement {
	pub(crate) fn new() -> Self {
		Self { _private: () }
	}
}
impl BindingElement for SkipSecurityElement {
	fn name(&self) -> &'static str {
		"skip_security"
	}

	fn role(&self) -> ElementRole {
		ElementRole::SkipSecurity
	}

	fn prepare_outgoing(&self, _: &mut Message) -> Result<Disposition> {
		Ok(Disposition::Applied)
	}

	fn process_incoming(&self, _: &mut Message) -> Result<Disposition> {
		Ok(Disposition::Applied)
	}
}
