//! Public-URL normalization for episode links (deterministic, no network IO).
//!
//! Hosting dashboards hand out creator-facing links; listeners need the public ones. Only known
//! shapes are rewritten, everything else is returned untouched.

use std::ops::Range;

/// Internal → public host pairs used when nothing is configured.
pub const DEFAULT_DOMAINS: &[(&str, &str)] = &[
    ("podcasters.spotify.com", "creators.spotify.com"),
    ("www.podcasters.spotify.com", "creators.spotify.com"),
];

fn host_matches(host: &str, pat: &str) -> bool {
    host.trim().eq_ignore_ascii_case(pat.trim())
}

/// `/pod/profile/<show>/episodes/<episode>` → `/pod/show/<show>/episodes/<episode>`.
fn profile_to_show(path: &str) -> Option<String> {
    let segs: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let (core, trailing_slash) = match segs.as_slice() {
        [core @ .., ""] if core.len() == 5 => (core, true),
        core if core.len() == 5 => (core, false),
        _ => return None,
    };
    match core {
        ["pod", "profile", show, "episodes", ep] if !show.is_empty() && !ep.is_empty() => {
            let mut out = format!("/pod/show/{show}/episodes/{ep}");
            if trailing_slash {
                out.push('/');
            }
            Some(out)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRewriteRules {
    domains: Vec<(String, String)>,
}

impl Default for UrlRewriteRules {
    fn default() -> Self {
        Self::new(
            DEFAULT_DOMAINS
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string())),
        )
    }
}

impl UrlRewriteRules {
    pub fn new(domains: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            domains: domains
                .into_iter()
                .filter(|(a, b)| !a.trim().is_empty() && !b.trim().is_empty())
                .collect(),
        }
    }

    /// Rewrite a link to its public form. Unparsable input and unknown shapes pass through.
    ///
    /// Only the host and path are replaced; every other byte of the input is kept as written.
    pub fn apply(&self, raw: &str) -> String {
        let s = raw.trim();
        if url::Url::parse(s).is_err() {
            return raw.to_string();
        }
        let Some((host, path)) = locate(s) else {
            return raw.to_string();
        };

        let new_host = self
            .domains
            .iter()
            .find(|(from, _)| host_matches(&s[host.clone()], from))
            .map(|(_, to)| to.trim());
        let new_path = profile_to_show(&s[path.clone()]);
        if new_host.is_none() && new_path.is_none() {
            return raw.to_string();
        }

        let mut out = String::with_capacity(s.len() + 8);
        out.push_str(&s[..host.start]);
        out.push_str(new_host.unwrap_or(&s[host.clone()]));
        out.push_str(&s[host.end..path.start]);
        out.push_str(new_path.as_deref().unwrap_or(&s[path.clone()]));
        out.push_str(&s[path.end..]);
        out
    }
}

/// Byte ranges of the host and the path in an absolute URL, as written.
fn locate(s: &str) -> Option<(Range<usize>, Range<usize>)> {
    let auth_start = s.find("://")? + 3;
    let auth_end = s[auth_start..]
        .find(&['/', '?', '#'][..])
        .map_or(s.len(), |i| auth_start + i);
    let host_start = s[auth_start..auth_end]
        .rfind('@')
        .map_or(auth_start, |i| auth_start + i + 1);
    let host_part = &s[host_start..auth_end];
    let host_len = if host_part.starts_with('[') {
        host_part.find(']').map_or(host_part.len(), |i| i + 1)
    } else {
        host_part.find(':').unwrap_or(host_part.len())
    };
    let path_end = s[auth_end..]
        .find(&['?', '#'][..])
        .map_or(s.len(), |i| auth_end + i);
    Some((host_start..host_start + host_len, auth_end..path_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_host_and_profile_path() {
        let r = UrlRewriteRules::default();
        assert_eq!(
            r.apply("https://podcasters.spotify.com/pod/profile/id-radio/episodes/ep-42-e2abc"),
            "https://creators.spotify.com/pod/show/id-radio/episodes/ep-42-e2abc"
        );
        assert_eq!(
            r.apply("https://WWW.Podcasters.Spotify.com/pod/profile/s/episodes/e/?t=1"),
            "https://creators.spotify.com/pod/show/s/episodes/e/?t=1"
        );
    }

    #[test]
    fn path_rewrite_applies_on_any_host() {
        let r = UrlRewriteRules::new(Vec::new());
        assert_eq!(
            r.apply("https://example.com/pod/profile/a/episodes/b"),
            "https://example.com/pod/show/a/episodes/b"
        );
    }

    #[test]
    fn unknown_shapes_pass_through_unchanged() {
        let r = UrlRewriteRules::default();
        for u in [
            "https://example.com/pod/profile/a",
            "https://example.com/pod/profile/a/episodes/b/extra",
            "https://open.spotify.com/episode/xyz",
            "not a url at all",
            "",
            "HTTPS://Example.com/Keep?Case=1",
        ] {
            assert_eq!(r.apply(u), u, "u={u:?}");
        }
    }

    #[test]
    fn configured_domains_replace_defaults() {
        let r = UrlRewriteRules::new(vec![(
            "anchor.fm".to_string(),
            "podcasters.example".to_string(),
        )]);
        assert_eq!(
            r.apply("https://anchor.fm/show/episodes/x"),
            "https://podcasters.example/show/episodes/x"
        );
        assert_eq!(
            r.apply("https://podcasters.spotify.com/x"),
            "https://podcasters.spotify.com/x"
        );
    }

    #[test]
    fn rewrite_keeps_the_rest_of_the_link_as_written() {
        let r = UrlRewriteRules::default();
        assert_eq!(
            r.apply("https://podcasters.spotify.com"),
            "https://creators.spotify.com"
        );
        assert_eq!(
            r.apply("https://podcasters.spotify.com:8443/pod/profile/s/episodes/e?q=café&n=a%20b#t"),
            "https://creators.spotify.com:8443/pod/show/s/episodes/e?q=café&n=a%20b#t"
        );
        assert_eq!(
            r.apply("https://user@podcasters.spotify.com/Mixed/Case?x=1"),
            "https://user@creators.spotify.com/Mixed/Case?x=1"
        );
        assert_eq!(
            r.apply("  https://example.com/pod/profile/a/episodes/b?utm=é  "),
            "https://example.com/pod/show/a/episodes/b?utm=é"
        );
    }
}
