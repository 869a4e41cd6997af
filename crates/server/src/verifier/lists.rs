//! Static domain and mailbox lists used for cheap, offline flags.

const DISPOSABLE_DOMAINS: &[&str] = &[
    "0-mail.com",
    "10minutemail.com",
    "20minutemail.com",
    "33mail.com",
    "anonbox.net",
    "discard.email",
    "dispostable.com",
    "emailondeck.com",
    "fakeinbox.com",
    "getairmail.com",
    "getnada.com",
    "guerrillamail.com",
    "guerrillamail.net",
    "guerrillamailblock.com",
    "harakirimail.com",
    "incognitomail.org",
    "mailcatch.com",
    "maildrop.cc",
    "mailinator.com",
    "mailnesia.com",
    "mintemail.com",
    "moakt.com",
    "mohmal.com",
    "mytemp.email",
    "sharklasers.com",
    "spam4.me",
    "spambox.us",
    "spamgourmet.com",
    "temp-mail.org",
    "tempail.com",
    "tempmail.net",
    "tempmailo.com",
    "throwawaymail.com",
    "trashmail.com",
    "trashmail.de",
    "yopmail.com",
    "yopmail.net",
];

const FREE_DOMAINS: &[&str] = &[
    "aol.com",
    "fastmail.com",
    "gmail.com",
    "gmx.com",
    "gmx.de",
    "googlemail.com",
    "hotmail.com",
    "hotmail.co.uk",
    "icloud.com",
    "live.com",
    "mail.com",
    "mail.ru",
    "me.com",
    "msn.com",
    "outlook.com",
    "proton.me",
    "protonmail.com",
    "web.de",
    "yahoo.com",
    "yahoo.co.uk",
    "yandex.ru",
    "zoho.com",
];

const ROLE_ACCOUNTS: &[&str] = &[
    "abuse",
    "accounts",
    "admin",
    "billing",
    "contact",
    "help",
    "hello",
    "hostmaster",
    "info",
    "jobs",
    "marketing",
    "no-reply",
    "noreply",
    "office",
    "postmaster",
    "privacy",
    "sales",
    "security",
    "support",
    "team",
    "webmaster",
];

/// Matches the domain itself or any parent domain in the list.
fn in_domain_list(list: &[&str], domain: &str) -> bool {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    let mut candidate = domain.as_str();
    loop {
        if list.contains(&candidate) {
            return true;
        }
        match candidate.split_once('.') {
            Some((_, parent)) if parent.contains('.') => candidate = parent,
            _ => return false,
        }
    }
}

pub fn is_disposable_domain(domain: &str) -> bool {
    in_domain_list(DISPOSABLE_DOMAINS, domain)
}

pub fn is_free_domain(domain: &str) -> bool {
    in_domain_list(FREE_DOMAINS, domain)
}

pub fn is_role_account(username: &str) -> bool {
    let local = username.split('+').next().unwrap_or(username);
    ROLE_ACCOUNTS.contains(&local.to_ascii_lowercase().as_str())
}
