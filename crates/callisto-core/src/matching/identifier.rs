//! Perpetrator identifier normalization

use crate::error::{CoreError, CoreResult};

/// Longest identifier accepted, in characters
pub const MAX_IDENTIFIER_LEN: usize = 500;

const PERPETRATOR_CONTEXT: &str = "callisto 2017 matching identifier";

/// Query parameters that only track where a link was shared from
const TRACKING_PARAMS: &[&str] = &["ref", "fref", "fbclid", "igshid"];

/// Canonical form used for equality.
///
/// Trims and case-folds. Profile URLs lose their scheme, `www.`/`m.` host
/// prefix, default port, tracking query parameters, fragment and trailing
/// slash; bare handles lose a leading `@`.
pub fn normalize(raw: &str) -> CoreResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("identifier", "This field is required."));
    }
    let length = trimmed.chars().count();
    if length > MAX_IDENTIFIER_LEN {
        return Err(CoreError::validation(
            "identifier",
            format!("Ensure this value has at most {MAX_IDENTIFIER_LEN} characters (it has {length})."),
        ));
    }

    let folded = trimmed.to_lowercase();
    let normalized = if looks_like_url(&folded) {
        canonical_url(&folded)
    } else {
        folded.trim_start_matches('@').to_string()
    };

    if normalized.is_empty() {
        return Err(CoreError::validation("identifier", "Enter a valid identifier."));
    }
    Ok(normalized)
}

/// Grouping key stored next to the identifier: BLAKE3 in derive-key mode, base58
pub fn perpetrator_key(normalized: &str) -> String {
    let mut hasher = blake3::Hasher::new_derive_key(PERPETRATOR_CONTEXT);
    hasher.update(normalized.as_bytes());
    bs58::encode(hasher.finalize().as_bytes()).into_string()
}

fn looks_like_url(s: &str) -> bool {
    if s.contains("://") || s.starts_with("www.") {
        return true;
    }
    if s.contains('@') || s.contains(char::is_whitespace) {
        return false;
    }
    let host = s.split(['/', '?', '#']).next().unwrap_or_default();
    host.contains('.') && !host.starts_with('.') && !host.ends_with('.')
}

fn canonical_url(s: &str) -> String {
    let without_scheme = s.split_once("://").map_or(s, |(_, rest)| rest);
    let without_fragment = without_scheme
        .split_once('#')
        .map_or(without_scheme, |(before, _)| before);
    let (location, query) = match without_fragment.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (without_fragment, None),
    };
    let (host, path) = match location.split_once('/') {
        Some((host, path)) => (host, path),
        None => (location, ""),
    };

    let host = host
        .trim_end_matches(":80")
        .trim_end_matches(":443");
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(host);

    let mut out = host.to_string();
    let path = path.trim_end_matches('/');
    if !path.is_empty() {
        out.push('/');
        out.push_str(path);
    }

    if let Some(query) = query {
        let mut params: Vec<&str> = query
            .split('&')
            .filter(|p| !p.is_empty())
            .filter(|p| {
                let name = p.split('=').next().unwrap_or_default();
                !name.starts_with("utm_") && !TRACKING_PARAMS.contains(&name)
            })
            .collect();
        params.sort_unstable();
        params.dedup();
        if !params.is_empty() {
            out.push('?');
            out.push_str(&params.join("&"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_forms_collapse() {
        let expected = "x.com/a";
        for raw in [
            "https://x.com/a",
            "HTTPS://X.COM/A",
            "http://www.x.com/a/",
            "  x.com/a  ",
            "https://x.com/a#top",
            "https://x.com:443/a?utm_source=tw&ref=share",
            "https://m.x.com/a",
        ] {
            assert_eq!(normalize(raw).unwrap(), expected, "{raw}");
        }
    }

    #[test]
    fn test_query_order_is_irrelevant() {
        assert_eq!(
            normalize("https://facebook.com/profile.php?b=2&id=1").unwrap(),
            normalize("facebook.com/profile.php?id=1&b=2").unwrap(),
        );
    }

    #[test]
    fn test_handles() {
        assert_eq!(normalize("@Perp").unwrap(), "perp");
        assert_eq!(normalize("Perp").unwrap(), "perp");
        assert_eq!(normalize("perp@example.com").unwrap(), "perp@example.com");
    }

    #[test]
    fn test_rejects_empty_and_long() {
        for raw in ["", "   ", "@"] {
            assert!(matches!(normalize(raw), Err(CoreError::Validation(_))), "{raw:?}");
        }
        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(normalize(&long).is_err());
        assert!(normalize(&"a".repeat(MAX_IDENTIFIER_LEN)).is_ok());
    }

    #[test]
    fn test_perpetrator_key_tracks_normalized_identity() {
        let a = perpetrator_key(&normalize("https://x.com/a").unwrap());
        let b = perpetrator_key(&normalize("HTTPS://X.COM/A").unwrap());
        let c = perpetrator_key(&normalize("https://x.com/b").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(bs58::decode(&a).into_vec().is_ok());
    }
}
