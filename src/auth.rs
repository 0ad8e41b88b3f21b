//! Auth-domain identifiers, secrets, key material, and token parameters.

pub mod id;
pub mod key;
pub mod parameters;
pub mod secret;

pub use id::*;
pub use key::*;
pub use parameters::*;
pub use secret::*;
