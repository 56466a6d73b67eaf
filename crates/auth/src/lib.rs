//! `vaptrack-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to mint/validate access tokens and hash/verify passwords, nothing else.

pub mod claims;
pub mod password;
pub mod roles;
pub mod token;

pub use claims::{AccessClaims, validate_claims};
pub use password::{hash_password, verify_password};
pub use roles::Role;
pub use token::{Hs256TokenService, TokenService};
