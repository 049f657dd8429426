//! Role-based authorization for incident operations.
//!
//! Every mutating endpoint asks [`authorize`] whether the request's
//! [`Principal`] may perform an [`Operation`]. The decision is a pure
//! membership test of the principal's role against the operation's allowed
//! set; there is no time or state component.

mod policy;
mod principal;
mod role;

pub use policy::{authorize, IncidentScope, Operation};
pub use principal::Principal;
pub use role::Role;
