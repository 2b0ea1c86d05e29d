//! Session wallet management
//!
//! A wallet lives only in process memory for the duration of a session. The
//! key arrives as a [`SecretString`](secrecy::SecretString), is parsed into a
//! signer, and is never written to disk or logs.

mod signer;

pub use signer::SessionWallet;
