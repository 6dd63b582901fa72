//! API-side enforcement of policy decisions.
//!
//! The policy functions in `taskboard-auth` only decide; this is the single
//! place where a deny becomes a 403 and gets logged.

use taskboard_auth::AuthDecision;

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

/// Turn a decision for `action` into `Ok(())` or a `Forbidden` error.
///
/// Must be called before any mutation.
pub fn enforce(principal: &PrincipalContext, action: &'static str, decision: AuthDecision) -> Result<(), ApiError> {
    decision.into_result().map_err(|reason| {
        let p = principal.principal();
        tracing::info!(
            principal_id = %p.id,
            roles = ?p.roles,
            action,
            reason = %reason,
            "authorization denied"
        );
        ApiError::Forbidden(reason)
    })
}
