//! Namespaced resource URI helpers.
//!
//! Child servers hand out resource URIs in whatever scheme they like
//! (`file://`, `postgres://`, custom ones). The aggregator rewrites every
//! URI into `resource://<serverName>/<path>` so identical paths on two
//! servers never collide, and remembers the original scheme so reads can
//! retry the exact original form against the child.

/// Scheme synthesized for namespaced URIs exposed to external clients.
pub const NAMESPACE_SCHEME: &str = "resource";

/// Split a URI into `(scheme, rest)` if it carries a `scheme://` prefix.
pub fn split_scheme(uri: &str) -> (Option<&str>, &str) {
    match uri.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() => (Some(scheme), rest),
        _ => (None, uri),
    }
}

/// Rewrite a child server's resource URI into the collision-free namespace.
///
/// Returns the namespaced URI and the original scheme (if the child used
/// one) so the read path can recover it later.
pub fn namespace_uri(server_name: &str, original_uri: &str) -> (String, Option<String>) {
    let (scheme, rest) = split_scheme(original_uri);
    let path = rest.trim_start_matches('/');
    let namespaced = format!("{NAMESPACE_SCHEME}://{server_name}/{path}");
    (namespaced, scheme.map(str::to_string))
}

/// Parse a namespaced URI back into `(serverName, path)`.
///
/// Returns `None` for URIs not in the `resource://<server>/<path>` form.
pub fn parse_namespaced(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("resource://")?;
    let (server, path) = rest.split_once('/')?;
    if server.is_empty() {
        return None;
    }
    Some((server, path))
}

/// Ordered candidate URIs to try against the child when reading.
///
/// The first candidate that yields non-empty contents wins. Children using
/// non-standard schemes are covered by the recovered-original-scheme form;
/// some children expect the bare path.
pub fn read_candidates(path: &str, original_scheme: Option<&str>) -> Vec<String> {
    let mut candidates = vec![format!("{NAMESPACE_SCHEME}://{path}")];
    if let Some(scheme) = original_scheme {
        if scheme != NAMESPACE_SCHEME {
            candidates.push(format!("{scheme}://{path}"));
        }
    }
    candidates.push(path.to_string());
    candidates
}
