//! Role-based authorization.
//!
//! Union semantics: possessing any one of the required roles is sufficient.
//! `public` in the required set means "no restriction". An empty subject
//! role list never reaches this check as empty — it normalizes to
//! `[public]` at subject resolution — so it never satisfies a non-empty
//! requirement.

use crate::config::roles::codes;

pub fn authorize(required: &[String], subject_codes: &[String]) -> bool {
    required.is_empty()
        || required
            .iter()
            .any(|r| r == codes::PUBLIC || subject_codes.iter().any(|c| c == r))
}
