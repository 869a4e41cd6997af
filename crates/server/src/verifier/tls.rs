//! Shared rustls client configuration for outbound HTTPS lookups.

use once_cell::sync::OnceCell;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;

static TLS_CONFIG: OnceCell<Arc<ClientConfig>> = OnceCell::new();

/// Built once; the root store is the bundled webpki roots.
pub fn shared_client_config() -> Arc<ClientConfig> {
    TLS_CONFIG
        .get_or_init(|| {
            let mut root_cert_store = RootCertStore::empty();
            root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            let config = ClientConfig::builder()
                .with_root_certificates(root_cert_store)
                .with_no_client_auth();

            Arc::new(config)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_is_shared() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let a = shared_client_config();
        let b = shared_client_config();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
