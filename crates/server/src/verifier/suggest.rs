//! Typo suggestions for mail domains ("gmial.com" -> "gmail.com").
//!
//! Domains are split into a registrable name and a public suffix first, so
//! that `yahoo.co.uk` is compared as `yahoo` + `co.uk` rather than as three
//! unrelated labels.

const COMMON_DOMAINS: &[&str] = &[
    "aol.com",
    "email.com",
    "gmail.com",
    "googlemail.com",
    "gmx.com",
    "gmx.de",
    "hotmail.com",
    "hotmail.co.uk",
    "icloud.com",
    "live.com",
    "mac.com",
    "mail.com",
    "me.com",
    "msn.com",
    "outlook.com",
    "protonmail.com",
    "web.de",
    "yahoo.com",
    "yahoo.co.uk",
    "yandex.ru",
    "ymail.com",
    "rocketmail.com",
];

/// Multi-label suffixes first so the longest match wins.
const PUBLIC_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "com.au", "net.au", "co.nz", "co.jp", "com.br", "co.in", "co.za",
    "com", "net", "org", "edu", "gov", "io", "co", "uk", "de", "fr", "nl", "ru", "ca", "au", "jp",
    "in", "br", "it", "es", "me", "info", "biz",
];

const MAX_DISTANCE: usize = 2;
/// Names up to this length only match at distance 1; two edits turn one
/// short provider name into another (`mac` -> `me`).
const SHORT_NAME_LEN: usize = 5;

fn max_distance(candidate: &str) -> usize {
    let name = split_suffix(candidate).map_or(candidate, |(name, _)| name);
    if name.len() <= SHORT_NAME_LEN {
        1
    } else {
        MAX_DISTANCE
    }
}

/// Returns a likely intended domain, or `None` if `domain` looks fine.
pub fn suggest_domain(domain: &str) -> Option<String> {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    if COMMON_DOMAINS.contains(&domain.as_str()) {
        return None;
    }

    let best = COMMON_DOMAINS
        .iter()
        .map(|candidate| (candidate, edit_distance(&domain, candidate)))
        .filter(|(candidate, d)| *d <= max_distance(candidate))
        .min_by_key(|(_, d)| *d);
    if let Some((candidate, _)) = best {
        return Some((*candidate).to_string());
    }

    // Fall back to fixing the suffix alone ("acme.cmo" -> "acme.com").
    let (name, suffix) = split_suffix(&domain)?;
    if PUBLIC_SUFFIXES.contains(&suffix) {
        return None;
    }
    PUBLIC_SUFFIXES
        .iter()
        .filter(|s| edit_distance(suffix, s) == 1)
        .min_by_key(|s| s.len().abs_diff(suffix.len()))
        .map(|s| format!("{name}.{s}"))
}

/// Splits off the longest known public suffix, or the last label otherwise.
fn split_suffix(domain: &str) -> Option<(&str, &str)> {
    for suffix in PUBLIC_SUFFIXES.iter().filter(|s| s.contains('.')) {
        if let Some(name) = domain.strip_suffix(suffix).and_then(|n| n.strip_suffix('.'))
            && !name.is_empty()
        {
            return Some((name, *suffix));
        }
    }
    domain.rsplit_once('.').filter(|(name, _)| !name.is_empty())
}

/// Optimal string alignment distance: Levenshtein plus adjacent transpositions.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut d = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        d[0][j] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[i - 1][j] + 1).min(d[i][j - 1] + 1).min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[i - 2][j - 2] + 1);
            }
            d[i][j] = best;
        }
    }
    d[a.len()][b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_common_domains() {
        assert_eq!(suggest_domain("gmial.com").as_deref(), Some("gmail.com"));
        assert_eq!(suggest_domain("hotmial.com").as_deref(), Some("hotmail.com"));
        assert_eq!(suggest_domain("yahoo.co.uj").as_deref(), Some("yahoo.co.uk"));
    }

    #[test]
    fn leaves_correct_domains_alone() {
        assert_eq!(suggest_domain("gmail.com"), None);
        assert_eq!(suggest_domain("acme-industries.com"), None);
        assert_eq!(suggest_domain("shop.co.uk"), None);
    }

    #[test]
    fn real_providers_are_not_typos() {
        assert_eq!(suggest_domain("ymail.com"), None);
        assert_eq!(suggest_domain("email.com"), None);
        assert_eq!(suggest_domain("mac.com"), None);
    }

    #[test]
    fn short_names_need_a_single_edit() {
        assert_eq!(suggest_domain("abc.com"), None);
        assert_eq!(suggest_domain("aol.con").as_deref(), Some("aol.com"));
        // Longer names still tolerate two edits
        assert_eq!(suggest_domain("hotmali.con").as_deref(), Some("hotmail.com"));
    }

    #[test]
    fn fixes_suffix_typos_on_unknown_names() {
        assert_eq!(
            suggest_domain("acme-industries.cmo").as_deref(),
            Some("acme-industries.com")
        );
    }

    #[test]
    fn splits_multi_label_suffixes() {
        assert_eq!(split_suffix("shop.co.uk"), Some(("shop", "co.uk")));
        assert_eq!(split_suffix("acme.io"), Some(("acme", "io")));
        assert_eq!(split_suffix("localhost"), None);
    }

    #[test]
    fn edit_distances() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("gmial", "gmail"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }
}
