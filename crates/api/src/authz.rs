//! Policy check at the operation boundary.

use tracing::warn;

use nesk_auth::{Action, Decision, Principal, ResourceDescriptor, authorize};

use crate::app::errors::{OpError, OpResult};

/// Authorize or fail with the uniform `Unauthorized` error.
pub fn guard(principal: &Principal, action: Action, resource: &ResourceDescriptor) -> OpResult<()> {
    match authorize(principal, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny { reason } => {
            warn!(
                action = %action,
                role = principal.role().as_str(),
                %reason,
                "operation denied"
            );
            Err(OpError::Unauthorized)
        }
    }
}

/// Role-gated check for actions that carry no resource metadata.
pub fn guard_role(principal: &Principal, action: Action) -> OpResult<()> {
    guard(principal, action, &ResourceDescriptor::none())
}
