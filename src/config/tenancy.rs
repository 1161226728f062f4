use std::env;

/// Strategy used to derive the tenant slug from an inbound request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TenantResolver {
    /// First label of the Host header, unless it is `www`.
    Subdomain,
    /// A configurable request header (default `x-tenant-id`).
    Header,
    /// A configurable query parameter (default `tid`).
    Query,
}

impl TenantResolver {
    fn parse(s: &str) -> Self {
        match s {
            "subdomain" => TenantResolver::Subdomain,
            "query" => TenantResolver::Query,
            _ => TenantResolver::Header,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TenancyConfig {
    pub enabled: bool,
    pub resolver: TenantResolver,
    pub header_key: String,
    pub query_key: String,
    /// Slug of the distinguished tenant whose admins may impersonate across
    /// tenant boundaries.
    pub system_tenant_slug: String,
}

impl TenancyConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("MULTI_TENANT")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            resolver: TenantResolver::parse(
                env::var("TENANT_RESOLVER")
                    .unwrap_or_else(|_| "header".to_string())
                    .as_str(),
            ),
            header_key: env::var("TENANT_HEADER_KEY").unwrap_or_else(|_| "x-tenant-id".to_string()),
            query_key: env::var("TENANT_QUERY_KEY").unwrap_or_else(|_| "tid".to_string()),
            system_tenant_slug: env::var("SYSTEM_TENANT_SLUG")
                .unwrap_or_else(|_| "system".to_string()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            resolver: TenantResolver::Header,
            header_key: "x-tenant-id".to_string(),
            query_key: "tid".to_string(),
            system_tenant_slug: "system".to_string(),
        }
    }
}
