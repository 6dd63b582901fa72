//! `taskboard-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the policy
//! functions decide, callers enforce.

pub mod claims;
pub mod password;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod token;
pub mod user;

pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use policy::{AuthDecision, DenyReason, TaskAction, TaskListScope};
pub use principal::{Capability, Principal};
pub use roles::{Role, UnknownRole};
pub use token::{Hs256Jwt, IssuedToken, JwtValidator, TokenIssueError};
pub use user::{NewUser, Registration, UserAccount, UserPatch, UserPatchInput};
