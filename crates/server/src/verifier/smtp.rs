//! Live SMTP probing.
//!
//! Opens a plain SMTP session to the highest-priority reachable MX host and
//! walks it up to `RCPT TO` without ever sending `DATA`.

use crate::error::VerifyError;
use crate::verifier::mx_cache::MailServer;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tracing::debug;
use utoipa::ToSchema;

/// What the receiving server said about the mailbox.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SmtpOutcome {
    pub host_exists: bool,
    pub full_inbox: bool,
    pub catch_all: bool,
    pub deliverable: bool,
    pub disabled: bool,
    /// The server refused the recipient outright.
    pub rejected: bool,
}

/// A parsed, possibly multi-line, SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub message: String,
}

impl Reply {
    pub fn is_positive(&self) -> bool {
        (200..400).contains(&self.code)
    }
}

/// Parses one reply line into its code, whether more lines follow, and text.
pub fn parse_reply_line(line: &str) -> Option<(u16, bool, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.len() < 3 || !line.is_char_boundary(3) {
        return None;
    }
    let code: u16 = line[..3].parse().ok()?;
    if !(200..600).contains(&code) {
        return None;
    }
    match line.as_bytes().get(3) {
        None => Some((code, false, "")),
        Some(b'-') => Some((code, true, &line[4..])),
        Some(b' ') => Some((code, false, &line[4..])),
        Some(_) => None,
    }
}

/// Interprets the reply to `RCPT TO` for the real address.
pub fn apply_rcpt_reply(outcome: &mut SmtpOutcome, reply: &Reply) {
    let msg = reply.message.to_ascii_lowercase();
    match reply.code {
        250 | 251 => outcome.deliverable = true,
        452 | 552 => outcome.full_inbox = true,
        550..=554 => {
            if msg.contains("disabled") || msg.contains("inactive") || msg.contains("suspended") {
                outcome.disabled = true;
            } else if msg.contains("full") || msg.contains("quota") || msg.contains("insufficient")
            {
                outcome.full_inbox = true;
            } else {
                outcome.rejected = true;
            }
        }
        _ => {}
    }
}

struct Session {
    reader: BufReader<TcpStream>,
    operation_timeout: Duration,
}

impl Session {
    async fn read_reply(&mut self) -> Result<Reply, VerifyError> {
        let mut message = String::new();
        loop {
            let mut line = String::new();
            let read = timeout(self.operation_timeout, self.reader.read_line(&mut line))
                .await
                .map_err(|_| VerifyError::Timeout(self.operation_timeout))?
                .map_err(|e| VerifyError::Smtp(e.to_string()))?;
            if read == 0 {
                return Err(VerifyError::Smtp("connection closed by server".into()));
            }
            let (code, more, text) = parse_reply_line(&line)
                .ok_or_else(|| VerifyError::Smtp(format!("malformed reply: {}", line.trim())))?;
            if !message.is_empty() {
                message.push('\n');
            }
            message.push_str(text);
            if !more {
                return Ok(Reply { code, message });
            }
        }
    }

    async fn command(&mut self, cmd: &str) -> Result<Reply, VerifyError> {
        debug!(command = %cmd, "SMTP >");
        let stream = self.reader.get_mut();
        timeout(
            self.operation_timeout,
            stream.write_all(format!("{cmd}\r\n").as_bytes()),
        )
        .await
        .map_err(|_| VerifyError::Timeout(self.operation_timeout))?
        .map_err(|e| VerifyError::Smtp(e.to_string()))?;
        let reply = self.read_reply().await?;
        debug!(code = reply.code, "SMTP <");
        Ok(reply)
    }
}

/// Settings for one SMTP check, borrowed from the verifier config.
pub struct SmtpCheck<'a> {
    pub hello_name: &'a str,
    pub from_email: &'a str,
    pub port: u16,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
    pub catch_all_check: bool,
}

impl SmtpCheck<'_> {
    /// Tries MX hosts in priority order until one accepts a session.
    ///
    /// Failing to talk to every host is an error; a host that answers but
    /// refuses the mailbox is a regular outcome.
    #[tracing::instrument(name = "smtp_check", skip(self, servers), fields(domain = %domain))]
    pub async fn check(
        &self,
        servers: &[MailServer],
        domain: &str,
        email: &str,
    ) -> Result<SmtpOutcome, VerifyError> {
        let mut last_error = VerifyError::Smtp(format!("no MX host for {domain}"));
        for server in servers {
            match self.check_host(&server.host, domain, email).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    debug!(host = %server.host, error = %e, "MX host unusable, trying next");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn check_host(
        &self,
        host: &str,
        domain: &str,
        email: &str,
    ) -> Result<SmtpOutcome, VerifyError> {
        let addr = format!("{}:{}", host.trim_end_matches('.'), self.port);
        let stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| VerifyError::Timeout(self.connect_timeout))?
            .map_err(|e| VerifyError::Smtp(format!("connect to {addr}: {e}")))?;
        let mut session = Session {
            reader: BufReader::new(stream),
            operation_timeout: self.operation_timeout,
        };

        let greeting = session.read_reply().await?;
        if !greeting.is_positive() {
            return Err(VerifyError::Smtp(format!(
                "{addr} refused session: {} {}",
                greeting.code, greeting.message
            )));
        }
        let mut outcome = SmtpOutcome {
            host_exists: true,
            ..Default::default()
        };

        let helo = session.command(&format!("HELO {}", self.hello_name)).await?;
        if !helo.is_positive() {
            return Err(VerifyError::Smtp(format!("HELO rejected: {}", helo.code)));
        }
        let mail = session
            .command(&format!("MAIL FROM:<{}>", self.from_email))
            .await?;
        if !mail.is_positive() {
            return Err(VerifyError::Smtp(format!(
                "MAIL FROM rejected: {} {}",
                mail.code, mail.message
            )));
        }

        if self.catch_all_check {
            let random_rcpt = format!("{}@{domain}", uuid::Uuid::new_v4().simple());
            let reply = session.command(&format!("RCPT TO:<{random_rcpt}>")).await?;
            if reply.is_positive() {
                outcome.catch_all = true;
            }
        }

        // A catch-all domain accepts everything, so the real RCPT adds nothing.
        if !outcome.catch_all {
            let reply = session.command(&format!("RCPT TO:<{email}>")).await?;
            apply_rcpt_reply(&mut outcome, &reply);
        }

        let _ = session.command("QUIT").await;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn reply(code: u16, message: &str) -> Reply {
        Reply {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn parses_single_and_multiline_replies() {
        assert_eq!(parse_reply_line("250 OK\r\n"), Some((250, false, "OK")));
        assert_eq!(
            parse_reply_line("250-mx.example.com\r\n"),
            Some((250, true, "mx.example.com"))
        );
        assert_eq!(parse_reply_line("220"), Some((220, false, "")));
        assert_eq!(parse_reply_line("hello"), None);
        assert_eq!(parse_reply_line("999 nope"), None);
    }

    #[test]
    fn rcpt_reply_classification() {
        let mut o = SmtpOutcome::default();
        apply_rcpt_reply(&mut o, &reply(250, "OK"));
        assert!(o.deliverable);

        let mut o = SmtpOutcome::default();
        apply_rcpt_reply(&mut o, &reply(550, "5.1.1 User unknown"));
        assert!(o.rejected && !o.deliverable);

        let mut o = SmtpOutcome::default();
        apply_rcpt_reply(&mut o, &reply(552, "Mailbox full"));
        assert!(o.full_inbox);

        let mut o = SmtpOutcome::default();
        apply_rcpt_reply(&mut o, &reply(550, "Account disabled"));
        assert!(o.disabled);
    }

    /// Scripted SMTP server: answers each command with the next canned reply.
    async fn fake_mx(replies: Vec<&'static str>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"220 fake.example ESMTP\r\n").await.unwrap();
            let mut buf = [0u8; 512];
            for reply in replies {
                if sock.read(&mut buf).await.unwrap_or(0) == 0 {
                    return;
                }
                sock.write_all(reply.as_bytes()).await.unwrap();
            }
        });
        port
    }

    fn smtp_check(port: u16, catch_all_check: bool) -> SmtpCheck<'static> {
        SmtpCheck {
            hello_name: "verifier.test",
            from_email: "check@verifier.test",
            port,
            connect_timeout: Duration::from_secs(2),
            operation_timeout: Duration::from_secs(2),
            catch_all_check,
        }
    }

    fn localhost() -> Vec<MailServer> {
        vec![MailServer {
            host: "127.0.0.1".into(),
            priority: 10,
        }]
    }

    #[tokio::test]
    async fn deliverable_mailbox() {
        let port = fake_mx(vec![
            "250 hello\r\n",
            "250 sender ok\r\n",
            "250 recipient ok\r\n",
            "221 bye\r\n",
        ])
        .await;
        let outcome = smtp_check(port, false)
            .check(&localhost(), "example.com", "a@example.com")
            .await
            .unwrap();
        assert!(outcome.host_exists);
        assert!(outcome.deliverable);
        assert!(!outcome.catch_all);
    }

    #[tokio::test]
    async fn catch_all_domain_skips_real_rcpt() {
        let port = fake_mx(vec![
            "250 hello\r\n",
            "250 sender ok\r\n",
            "250 anything goes\r\n",
            "221 bye\r\n",
        ])
        .await;
        let outcome = smtp_check(port, true)
            .check(&localhost(), "example.com", "a@example.com")
            .await
            .unwrap();
        assert!(outcome.catch_all);
        assert!(!outcome.deliverable);
    }

    #[tokio::test]
    async fn unreachable_hosts_are_an_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let result = smtp_check(port, false)
            .check(&localhost(), "example.com", "a@example.com")
            .await;
        assert!(matches!(result, Err(VerifyError::Smtp(_))));
    }
}
