//! Extension negotiation: encodes attached payloads on send, decodes recognized ones on receive.

// self
use crate::{
	_prelude::*,
	binding::{BindingElement, Disposition, ElementRole},
	message::{ExtensionRegistry, Message, field},
};

/// Moves extension payloads between [`Message::extensions`] and alias-prefixed wire fields.
///
/// A namespace is declared as `ns.<alias>=<type uri>` and its fields travel as
/// `<alias>.<name>`. Namespaces missing from the registry are left on the message untouched.
#[derive(Clone, Debug)]
pub struct ExtensionsElement {
	registry: Arc<ExtensionRegistry>,
}
impl ExtensionsElement {
	/// Creates the element over a shared registry.
	pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
		Self { registry }
	}
}
impl BindingElement for ExtensionsElement {
	fn name(&self) -> &'static str {
		"extensions"
	}

	fn role(&self) -> ElementRole {
		ElementRole::Transform
	}

	fn prepare_outgoing(&self, message: &mut Message) -> Result<Disposition> {
		let extensions = message.take_extensions();

		if extensions.is_empty() {
			return Ok(Disposition::NotApplicable);
		}

		for (type_uri, extension) in extensions {
			let codec = self.registry.get(&type_uri).ok_or_else(|| {
				Rejection::policy(format!("extension `{type_uri}` is not registered"))
			})?;
			let encoded = codec.encode(&extension)?;
			let alias = free_alias(message, codec.preferred_alias());

			message.set(format!("{}{alias}", field::EXTENSION_NS_PREFIX), type_uri);

			for (name, value) in encoded {
				message.set(format!("{alias}.{name}"), value);
			}
		}

		Ok(Disposition::Applied)
	}

	fn process_incoming(&self, message: &mut Message) -> Result<Disposition> {
		let declared = message
			.fields()
			.iter()
			.filter_map(|(key, type_uri)| {
				let alias = key.strip_prefix(field::EXTENSION_NS_PREFIX)?;

				self.registry.get(type_uri).map(|codec| (alias.to_owned(), codec.clone()))
			})
			.collect::<Vec<_>>();

		if declared.is_empty() {
			return Ok(Disposition::NotApplicable);
		}

		for (alias, codec) in declared {
			let prefix = format!("{alias}.");
			let names = message
				.fields()
				.keys()
				.filter(|key| key.starts_with(&prefix))
				.cloned()
				.collect::<Vec<_>>();
			let mut fields = BTreeMap::new();

			for name in names {
				if let Some(value) = message.remove(&name) {
					fields.insert(name[prefix.len()..].to_owned(), value);
				}
			}

			message.remove(&format!("{}{alias}", field::EXTENSION_NS_PREFIX));
			message.add_extension(codec.decode(fields)?);
		}

		Ok(Disposition::Applied)
	}
}

fn free_alias(message: &Message, preferred: &str) -> String {
	let taken = |alias: &str| {
		message.has_field(&format!("{}{alias}", field::EXTENSION_NS_PREFIX))
			|| message.fields().keys().any(|key| key.starts_with(&format!("{alias}.")))
	};

	if !taken(preferred) {
		return preferred.to_owned();
	}

	(1..)
		.map(|n| format!("ext{n}"))
		.find(|alias| !taken(alias))
		.unwrap_or_else(|| preferred.to_owned())
}
