//! Gravatar presence check.

use crate::error::VerifyError;
use crate::verifier::Gravatar;
use crate::verifier::tls::shared_client_config;
use bytes::Bytes;
use http_body_util::Empty;
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use rustls_pki_types::ServerName;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tokio_rustls::TlsConnector;
use tracing::debug;

const GRAVATAR_HOST: &str = "gravatar.com";

/// Avatar URL for an address, per Gravatar's SHA-256 hashing scheme.
pub fn gravatar_url(email: &str) -> String {
    let hash = Sha256::digest(email.trim().to_lowercase().as_bytes());
    format!("https://{GRAVATAR_HOST}/avatar/{hash:x}")
}

/// `HEAD`s the avatar with `d=404`: 200 means a custom avatar exists.
#[tracing::instrument(name = "gravatar_lookup", level = "debug", skip(email))]
pub async fn check_gravatar(email: &str, limit: Duration) -> Result<Gravatar, VerifyError> {
    let url = gravatar_url(email);
    let path = format!("{}?d=404", &url[url.find("/avatar").unwrap_or(0)..]);

    let stream = timeout(limit, TcpStream::connect((GRAVATAR_HOST, 443)))
        .await
        .map_err(|_| VerifyError::Timeout(limit))?
        .map_err(|e| VerifyError::Http(e.to_string()))?;
    let connector = TlsConnector::from(shared_client_config());
    let domain = ServerName::try_from(GRAVATAR_HOST)
        .map_err(|e| VerifyError::Internal(e.to_string()))?;
    let tls_stream = timeout(limit, connector.connect(domain, stream))
        .await
        .map_err(|_| VerifyError::Timeout(limit))?
        .map_err(|e| VerifyError::Http(format!("TLS: {e}")))?;

    let status = head_request(tls_stream, &path, limit).await?;
    let has_gravatar = status == StatusCode::OK;
    Ok(Gravatar {
        has_gravatar,
        gravatar_url: if has_gravatar { url } else { String::new() },
    })
}

/// Sends one HTTP/1.1 `HEAD` over an established stream and returns the
/// status. Connection failures are only logged at debug level, the lookup
/// being optional.
async fn head_request<T>(io: T, path: &str, limit: Duration) -> Result<StatusCode, VerifyError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io))
        .await
        .map_err(|e| VerifyError::Http(e.to_string()))?;
    tokio::task::spawn(async move {
        if let Err(err) = conn.await {
            debug!(error = %err, "Gravatar connection closed with error");
        }
    });

    let req = Request::builder()
        .method(Method::HEAD)
        .uri(path)
        .header(hyper::header::HOST, GRAVATAR_HOST)
        .header(hyper::header::USER_AGENT, "lead-verifier/0.1")
        .body(Empty::<Bytes>::new())
        .map_err(|e| VerifyError::Http(e.to_string()))?;
    let res = timeout(limit, sender.send_request(req))
        .await
        .map_err(|_| VerifyError::Timeout(limit))?
        .map_err(|e| VerifyError::Http(e.to_string()))?;

    Ok(res.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::util::SubscriberInitExt;

    /// Counts warnings and errors.
    #[derive(Clone, Default)]
    struct LevelCounter {
        loud: Arc<AtomicUsize>,
    }

    impl<S: Subscriber> Layer<S> for LevelCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() <= Level::WARN {
                self.loud.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Answers the first request on the other end of a duplex pipe.
    async fn serve_once(reply: &'static [u8]) -> tokio::io::DuplexStream {
        let (client, mut server) = duplex(4096);
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let _ = server.read(&mut buf).await;
            let _ = server.write_all(reply).await;
            let _ = server.shutdown().await;
        });
        client
    }

    #[test]
    fn url_hash_is_normalized() {
        assert_eq!(
            gravatar_url(" Jane@Example.com "),
            gravatar_url("jane@example.com")
        );
        let url = gravatar_url("jane@example.com");
        assert!(url.starts_with("https://gravatar.com/avatar/"));
        assert_eq!(url.len(), "https://gravatar.com/avatar/".len() + 64);
    }

    #[tokio::test]
    async fn head_request_returns_status() {
        let io = serve_once(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n").await;
        let status = head_request(io, "/avatar/abc?d=404", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn connection_errors_stay_below_warn() {
        let counter = LevelCounter::default();
        let _guard = tracing_subscriber::registry()
            .with(counter.clone())
            .set_default();

        // Trailing bytes arrive on an otherwise idle connection
        let io = serve_once(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\ngarbage").await;
        let status = head_request(io, "/avatar/abc?d=404", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(counter.loud.load(Ordering::SeqCst), 0);
    }
}
