use std::env;

/// Site-wide MFA policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MfaPolicy {
    /// Users choose whether to enroll.
    Optional,
    /// Every login without an enrolled factor is forced into setup.
    Mandatory,
    /// Enrollment is allowed, disabling is not.
    OneWay,
}

impl MfaPolicy {
    fn parse(s: &str) -> Self {
        match s {
            "mandatory" => MfaPolicy::Mandatory,
            "one_way" | "one-way" => MfaPolicy::OneWay,
            _ => MfaPolicy::Optional,
        }
    }

    pub fn allows_disable(&self) -> bool {
        matches!(self, MfaPolicy::Optional)
    }
}

#[derive(Clone, Debug)]
pub struct MfaConfig {
    pub policy: MfaPolicy,
    /// Issuer label shown in authenticator apps.
    pub app_name: String,
}

impl MfaConfig {
    pub fn from_env() -> Self {
        Self {
            policy: MfaPolicy::parse(
                env::var("MFA_POLICY")
                    .unwrap_or_else(|_| "optional".to_string())
                    .as_str(),
            ),
            app_name: env::var("MFA_APP_NAME").unwrap_or_else(|_| "Palisade".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parse() {
        assert_eq!(MfaPolicy::parse("mandatory"), MfaPolicy::Mandatory);
        assert_eq!(MfaPolicy::parse("one_way"), MfaPolicy::OneWay);
        assert_eq!(MfaPolicy::parse("optional"), MfaPolicy::Optional);
        assert_eq!(MfaPolicy::parse(""), MfaPolicy::Optional);
    }

    #[test]
    fn only_optional_allows_disable() {
        assert!(MfaPolicy::Optional.allows_disable());
        assert!(!MfaPolicy::Mandatory.allows_disable());
        assert!(!MfaPolicy::OneWay.allows_disable());
    }
}
