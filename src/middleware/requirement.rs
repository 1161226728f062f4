//! Static route security declarations.
//!
//! Every route's required-role set and tenant-context flag are declared at
//! startup and looked up read-only at request time, keyed by method and
//! matched path pattern. No request-time mutation exists, so concurrent
//! lookups need no locking.

use std::collections::HashMap;

use axum::http::Method;

use crate::config::roles::{codes, roles};

#[derive(Clone, Debug)]
pub struct RouteRequirement {
    pub required_roles: Vec<String>,
    pub tenant_context_opt_out: bool,
    /// Consumed by body-handling collaborators, not by the pipeline.
    pub raw_body: bool,
}

impl Default for RouteRequirement {
    fn default() -> Self {
        Self::public()
    }
}

impl RouteRequirement {
    /// No authentication required. An empty required-role set is implicitly
    /// public.
    pub fn public() -> Self {
        Self {
            required_roles: Vec::new(),
            tenant_context_opt_out: false,
            raw_body: false,
        }
    }

    /// Requires any one of the given role codes.
    ///
    /// # Panics
    ///
    /// Panics on a role code missing from the role table. Declarations run
    /// at startup, so a typo fails the boot instead of silently granting or
    /// denying access at request time.
    pub fn roles(required: &[&str]) -> Self {
        for code in required {
            assert!(
                roles().contains(code),
                "unknown role code in route declaration: {code}"
            );
        }
        Self {
            required_roles: required.iter().map(|c| c.to_string()).collect(),
            tenant_context_opt_out: false,
            raw_body: false,
        }
    }

    pub fn opt_out_tenant(mut self) -> Self {
        self.tenant_context_opt_out = true;
        self
    }

    pub fn with_raw_body(mut self) -> Self {
        self.raw_body = true;
        self
    }

    pub fn is_public(&self) -> bool {
        self.required_roles.is_empty()
            || self.required_roles.iter().any(|c| c == codes::PUBLIC)
    }

    pub fn requires_authentication(&self) -> bool {
        !self.is_public()
    }
}

/// Startup-built table of route declarations.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: HashMap<(Method, String), RouteRequirement>,
}

impl RouteTable {
    pub fn declare(&mut self, method: Method, path: &str, requirement: RouteRequirement) {
        self.routes.insert((method, path.to_string()), requirement);
    }

    /// Requirement for a matched route. Undeclared routes default to public
    /// with tenant context on.
    pub fn requirement_of(&self, method: &Method, matched_path: &str) -> RouteRequirement {
        self.routes
            .get(&(method.clone(), matched_path.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}
