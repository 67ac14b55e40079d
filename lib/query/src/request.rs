//! Query request types.

use crate::compile::QuerySpec;
use quarry_core::{OrgId, UserId};
use serde::{Deserialize, Serialize};

/// Authorization attached to a query request.
///
/// The token is scoped to the task owner; the engine validates it against
/// the organization's grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// The user the query runs as.
    pub user: UserId,
    /// Opaque bearer token presented to the engine.
    pub token: String,
}

impl Authorization {
    /// Derives an authorization for the given task owner.
    #[must_use]
    pub fn for_user(user: UserId) -> Self {
        Self {
            token: format!("task-run/{user}"),
            user,
        }
    }
}

/// A request submitted to the query service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The organization the query is scoped and billed to.
    pub org: OrgId,
    /// The compiled specification to evaluate.
    pub spec: QuerySpec,
    /// Authorization derived from the task owner.
    pub authorization: Authorization,
}
