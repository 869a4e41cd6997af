//! Address syntax checks.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Syntax {
    pub username: String,
    pub domain: String,
    pub valid: bool,
}

const MAX_LOCAL_LEN: usize = 64;
const MAX_DOMAIN_LEN: usize = 253;

/// Splits `email` into local part and lowercased domain and checks both.
///
/// Deliberately conservative: quoted local parts and address literals are
/// treated as invalid.
pub fn parse_address(email: &str) -> Syntax {
    let email = email.trim();
    let Some((username, domain)) = email.rsplit_once('@') else {
        return Syntax::default();
    };
    let domain = domain.to_ascii_lowercase();
    let valid = is_valid_local_part(username) && is_valid_domain(&domain);
    Syntax {
        username: username.to_string(),
        domain,
        valid,
    }
}

fn is_valid_local_part(local: &str) -> bool {
    if local.is_empty() || local.len() > MAX_LOCAL_LEN {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.".contains(c))
}

fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN || !domain.contains('.') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    // TLDs are never purely numeric
    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && !tld.chars().all(|c| c.is_ascii_digit()));
    labels_ok && tld_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        let s = parse_address("John.Doe+tag@Example.COM");
        assert!(s.valid);
        assert_eq!(s.username, "John.Doe+tag");
        assert_eq!(s.domain, "example.com");
    }

    #[test]
    fn rejects_missing_at_or_parts() {
        assert!(!parse_address("plainaddress").valid);
        assert!(!parse_address("@example.com").valid);
        assert!(!parse_address("user@").valid);
    }

    #[test]
    fn rejects_bad_dots_and_labels() {
        assert!(!parse_address("a..b@example.com").valid);
        assert!(!parse_address(".a@example.com").valid);
        assert!(!parse_address("a@-example.com").valid);
        assert!(!parse_address("a@example").valid);
        assert!(!parse_address("a@example.123").valid);
        assert!(!parse_address("a@exa_mple.com").valid);
    }

    #[test]
    fn rejects_overlong_local_part() {
        let local = "a".repeat(65);
        assert!(!parse_address(&format!("{local}@example.com")).valid);
    }
}
