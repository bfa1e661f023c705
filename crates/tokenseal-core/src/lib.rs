//! Tokenseal protocol core.
//!
//! Drives a security context from nothing to open and then protects one
//! message exchange with it:
//!
//! ```text
//! establish_context ──> SecurityContext (open) ──> protect / verify ──> release
//!        │                      │
//!        └── TokenTransport     └── SecurityProvider (opaque mechanism)
//! ```
//!
//! # Components
//!
//! - [`SecurityProvider`]: the mechanism seam (name import, context steps,
//!   wrap, MIC verification, inquiry, release)
//! - [`Negotiator`] / [`establish_context`]: the bounded token-exchange loop
//! - [`protect`] / [`verify`]: message protection against an open context
//! - [`SecurityContext`]: lifecycle guard that releases the provider context
//!   on every exit path
//! - [`psk`]: the production pre-shared-key mechanism
//! - [`env`]: time and randomness abstraction for deterministic tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod context;
pub mod env;
pub mod error;
pub mod name;
pub mod negotiator;
pub mod protector;
pub mod provider;
pub mod psk;
pub mod status;

pub use context::{ContextState, SecurityContext};
pub use env::{EntropyError, Environment};
pub use error::{NegotiationError, ProtectionError};
pub use name::ServiceName;
pub use negotiator::{DEFAULT_MAX_ROUNDS, Negotiator, establish_context};
pub use protector::{protect, verify};
pub use provider::{ContextInfo, ContextStep, SecurityProvider, StepStatus, Wrapped};
pub use status::{MajorStatus, StatusCode};
pub use tokenseal_proto::{ContextFlags, Oid, Token};
