//! Approximate collection sizes from pagination metadata.
//!
//! A collection requested with `per_page=1` has exactly as many pages as
//! items, so the `page` number of the `rel="last"` link is the item count.

use crate::transport::Transport;

/// Estimate the number of items behind a `per_page=1` collection URL.
///
/// Never fails: a transport error or non-2xx response yields 0.
pub async fn estimate_count(transport: &dyn Transport, url: &str) -> u64 {
    let response = match transport.get(url).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url, error = %e, "count request failed");
            return 0;
        }
    };

    if !response.is_success() {
        tracing::debug!(url, status = response.status, "count request rejected");
        return 0;
    }

    if let Some(last) = response.header("link").and_then(parse_last_page) {
        return last;
    }

    // Zero or one page: the body holds every item.
    response
        .body
        .as_array()
        .map(|items| items.len() as u64)
        .unwrap_or(0)
}

/// Extract the `page` query parameter of the `rel="last"` entry in a `Link` header.
pub fn parse_last_page(header: &str) -> Option<u64> {
    header
        .split(',')
        .filter_map(parse_link_value)
        .find(|(_, rels)| rels.split_whitespace().any(|rel| rel == "last"))
        .and_then(|(url, _)| query_param(url, "page"))
        .and_then(|page| page.parse().ok())
}

/// Split `<url>; rel="a b"; other=x` into the url and the rel value.
fn parse_link_value(value: &str) -> Option<(&str, &str)> {
    let value = value.trim();
    let url = value.strip_prefix('<')?;
    let end = url.find('>')?;
    let (url, params) = (&url[..end], &url[end + 1..]);

    let rel = params.split(';').find_map(|param| {
        let (key, val) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("rel") {
            Some(val.trim().trim_matches('"'))
        } else {
            None
        }
    })?;

    Some((url, rel))
}

fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}
