//! Email deliverability verification.
//!
//! The queue only depends on the [`VerificationProvider`] trait. The bundled
//! [`SmtpVerifier`] combines syntax checks, static domain lists, MX lookups,
//! a live SMTP check and a Gravatar lookup into one [`VerificationResult`].

pub mod gravatar;
pub mod lists;
pub mod mx_cache;
pub mod smtp;
pub mod suggest;
pub mod syntax;
pub mod tls;

use crate::config::VerifierConfig;
use crate::error::VerifyError;
use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

pub use mx_cache::MxCache;
pub use smtp::SmtpOutcome;
pub use syntax::Syntax;

/// Provider verdict on whether an address can plausibly receive mail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Reachable {
    Yes,
    No,
    Unknown,
}

impl Reachable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reachable::Yes => "yes",
            Reachable::No => "no",
            Reachable::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Gravatar {
    pub has_gravatar: bool,
    pub gravatar_url: String,
}

/// Everything a provider learned about one address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerificationResult {
    pub email: String,
    pub reachable: Reachable,
    pub syntax: Syntax,
    pub smtp: Option<SmtpOutcome>,
    pub gravatar: Option<Gravatar>,
    pub suggestion: String,
    pub disposable: bool,
    pub role_account: bool,
    pub free: bool,
    pub has_mx_records: bool,
}

impl VerificationResult {
    /// A result carrying only a verdict, used when no network checks ran.
    pub fn with_verdict(email: &str, reachable: Reachable) -> Self {
        Self {
            email: email.to_string(),
            reachable,
            syntax: syntax::parse_address(email),
            smtp: None,
            gravatar: None,
            suggestion: String::new(),
            disposable: false,
            role_account: false,
            free: false,
            has_mx_records: false,
        }
    }
}

/// A remote capability classifying email deliverability.
///
/// Calls may be slow and may fail transiently. There is no cancellation.
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    async fn verify(&self, email: &str) -> Result<VerificationResult, VerifyError>;
}

/// Final verdict from the collected checks.
pub fn classify(syntax_valid: bool, has_mx: bool, smtp: Option<&SmtpOutcome>) -> Reachable {
    if !syntax_valid || !has_mx {
        return Reachable::No;
    }
    match smtp {
        None => Reachable::Unknown,
        Some(s) if s.catch_all => Reachable::Unknown,
        Some(s) if s.deliverable => Reachable::Yes,
        Some(s) if s.disabled || !s.host_exists => Reachable::No,
        Some(s) if s.rejected => Reachable::No,
        Some(_) => Reachable::Unknown,
    }
}

/// Verification provider backed by DNS and a live SMTP conversation.
pub struct SmtpVerifier {
    config: VerifierConfig,
    resolver: Arc<TokioResolver>,
    mx_cache: MxCache,
}

impl SmtpVerifier {
    pub fn new(config: VerifierConfig) -> Result<Self, VerifyError> {
        let resolver = TokioResolver::builder_tokio()
            .map_err(|e| VerifyError::Internal(format!("resolver setup failed: {e}")))?
            .build();
        Ok(Self::with_resolver(config, Arc::new(resolver)))
    }

    pub fn with_resolver(config: VerifierConfig, resolver: Arc<TokioResolver>) -> Self {
        Self {
            config,
            resolver,
            mx_cache: MxCache::default(),
        }
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.config.connect_timeout_secs)
    }

    fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.config.operation_timeout_secs)
    }
}

#[async_trait]
impl VerificationProvider for SmtpVerifier {
    #[tracing::instrument(name = "verify_email", skip(self), fields(email = %email))]
    async fn verify(&self, email: &str) -> Result<VerificationResult, VerifyError> {
        let mut result = VerificationResult::with_verdict(email, Reachable::Unknown);
        if !result.syntax.valid {
            result.reachable = Reachable::No;
            return Ok(result);
        }
        let domain = result.syntax.domain.clone();
        let username = result.syntax.username.clone();

        result.free = lists::is_free_domain(&domain);
        result.role_account = lists::is_role_account(&username);
        if self.config.disposable_check {
            result.disposable = lists::is_disposable_domain(&domain);
        }
        if self.config.domain_suggest {
            result.suggestion = suggest::suggest_domain(&domain).unwrap_or_default();
        }

        let mx_hosts = self.mx_cache.lookup(&self.resolver, &domain).await?;
        result.has_mx_records = !mx_hosts.is_empty();
        if !result.has_mx_records {
            result.reachable = Reachable::No;
            return Ok(result);
        }

        if self.config.smtp_check {
            let smtp_check = smtp::SmtpCheck {
                hello_name: &self.config.hello_name,
                from_email: &self.config.from_email,
                port: self.config.smtp_port,
                connect_timeout: self.connect_timeout(),
                operation_timeout: self.operation_timeout(),
                catch_all_check: self.config.catch_all_check,
            };
            result.smtp = Some(smtp_check.check(&mx_hosts, &domain, email).await?);
        }

        if self.config.gravatar_check {
            match gravatar::check_gravatar(email, self.operation_timeout()).await {
                Ok(g) => result.gravatar = Some(g),
                Err(e) => tracing::debug!(error = %e, "Gravatar lookup failed, skipping"),
            }
        }

        result.reachable = classify(true, true, result.smtp.as_ref());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> SmtpOutcome {
        SmtpOutcome {
            host_exists: true,
            ..Default::default()
        }
    }

    #[test]
    fn invalid_syntax_or_missing_mx_is_unreachable() {
        assert_eq!(classify(false, true, None), Reachable::No);
        assert_eq!(classify(true, false, None), Reachable::No);
    }

    #[test]
    fn smtp_disabled_is_unknown() {
        assert_eq!(classify(true, true, None), Reachable::Unknown);
    }

    #[test]
    fn deliverable_is_yes_unless_catch_all() {
        let mut s = outcome();
        s.deliverable = true;
        assert_eq!(classify(true, true, Some(&s)), Reachable::Yes);
        s.catch_all = true;
        assert_eq!(classify(true, true, Some(&s)), Reachable::Unknown);
    }

    #[test]
    fn rejected_mailbox_is_no() {
        let mut s = outcome();
        s.rejected = true;
        assert_eq!(classify(true, true, Some(&s)), Reachable::No);
    }

    #[test]
    fn reachable_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Reachable::Yes).unwrap(), "\"yes\"");
        assert_eq!(Reachable::Unknown.as_str(), "unknown");
    }
}
