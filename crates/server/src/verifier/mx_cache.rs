//! MX lookups with a short-lived per-domain cache.
//!
//! A drain typically hits the same handful of domains (gmail.com, outlook.com)
//! thousands of times; caching keeps DNS traffic proportional to the number of
//! distinct domains instead.

use crate::error::VerifyError;
use dashmap::DashMap;
use hickory_resolver::TokioResolver;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

const DEFAULT_TTL: Duration = Duration::from_secs(300);
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailServer {
    pub host: String,
    pub priority: u16,
}

#[derive(Clone)]
struct CacheEntry {
    servers: Vec<MailServer>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

#[derive(Clone)]
pub struct MxCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
    cleanup_interval: Duration,
    last_cleanup: Arc<Mutex<Instant>>,
}

impl Default for MxCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MxCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            cleanup_interval: ttl.min(CLEANUP_INTERVAL),
            last_cleanup: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Drops every expired entry, at most once per cleanup interval.
    fn maybe_cleanup(&self) {
        if let Ok(mut last_cleanup) = self.last_cleanup.try_lock()
            && last_cleanup.elapsed() >= self.cleanup_interval
        {
            *last_cleanup = Instant::now();
            drop(last_cleanup);
            self.entries.retain(|_, entry| !entry.is_expired());
        }
    }

    pub fn get(&self, domain: &str) -> Option<Vec<MailServer>> {
        self.maybe_cleanup();
        let entry = self.entries.get(domain)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove(domain);
            return None;
        }
        Some(entry.servers.clone())
    }

    pub fn insert(&self, domain: &str, servers: Vec<MailServer>) {
        self.maybe_cleanup();
        self.entries.insert(
            domain.to_string(),
            CacheEntry {
                servers,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// MX hosts for `domain`, lowest preference first. An empty vector means
    /// the domain publishes no MX records; resolver failures are errors.
    #[tracing::instrument(name = "mx_lookup", skip(self, resolver))]
    pub async fn lookup(
        &self,
        resolver: &TokioResolver,
        domain: &str,
    ) -> Result<Vec<MailServer>, VerifyError> {
        if let Some(servers) = self.get(domain) {
            return Ok(servers);
        }

        let lookup = timeout(LOOKUP_TIMEOUT, resolver.mx_lookup(format!("{domain}.")))
            .await
            .map_err(|_| VerifyError::Timeout(LOOKUP_TIMEOUT))?;
        let mut servers: Vec<MailServer> = match lookup {
            Ok(mx) => mx
                .iter()
                .map(|record| MailServer {
                    host: record.exchange().to_utf8(),
                    priority: record.preference(),
                })
                // RFC 7505 null MX: the domain accepts no mail
                .filter(|s| s.host != ".")
                .collect(),
            Err(e) if e.is_no_records_found() || e.is_nx_domain() => Vec::new(),
            Err(e) => {
                return Err(VerifyError::Dns {
                    domain: domain.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        servers.sort_by_key(|s| s.priority);
        debug!(count = servers.len(), "Resolved MX hosts");

        self.insert(domain, servers.clone());
        Ok(servers)
    }
}
