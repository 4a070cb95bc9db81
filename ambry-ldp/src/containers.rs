//! Shared container plumbing: URL building, membership listings, pagination,
//! and basic-container creation.

use crate::error::{LdpError, LdpResult};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

pub(crate) const LDP_BASIC_CONTAINER_LINK: &str =
    "<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\"";
const LDP_CONTAINS_IRI: &str = "http://www.w3.org/ns/ldp#contains";

/// Joins a base container URL and a relative path, percent-encoding each
/// segment and preserving a trailing `/`.
pub(crate) fn to_absolute_url(base: &str, relative: &str) -> String {
    let encoded = relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if relative.ends_with('/') && !encoded.is_empty() {
        format!("{base}{encoded}/")
    } else {
        format!("{base}{encoded}")
    }
}

/// The chain of container prefixes above `relative`, shallowest first.
/// `"a/b/c.txt"` yields `["a/", "a/b/"]`; `"a/b/"` yields `["a/"]`.
pub(crate) fn parent_containers(relative: &str) -> Vec<String> {
    let trimmed = relative.strip_suffix('/').unwrap_or(relative);
    let mut segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    let mut out = Vec::with_capacity(segments.len());
    let mut current = String::new();
    for segment in segments {
        current.push_str(segment);
        current.push('/');
        out.push(current.clone());
    }
    out
}

/// Extracts the target of a `rel="next"` member from a `Link` header.
pub(crate) fn parse_next_link(header: &str) -> Option<String> {
    for part in header.split(',') {
        let part = part.trim();
        if !part.contains("rel=\"next\"") {
            continue;
        }
        let start = part.find('<')?;
        let end = part.find('>')?;
        if start < end {
            return Some(part[start + 1..end].to_string());
        }
    }
    None
}

/// Pulls member URLs out of a JSON-LD container document. Handles the
/// compact `ldp:contains` key and the full IRI, values as a single member or
/// an array, members as plain strings or objects with `@id`.
fn member_urls(body: &Value) -> Vec<String> {
    let contains = body
        .get("ldp:contains")
        .or_else(|| body.get(LDP_CONTAINS_IRI));
    let mut members = Vec::new();
    let mut push = |member: &Value| {
        let id = match member {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("@id").and_then(Value::as_str),
            _ => None,
        };
        if let Some(id) = id {
            members.push(id.to_string());
        }
    };
    match contains {
        Some(Value::Array(items)) => items.iter().for_each(&mut push),
        Some(single) => push(single),
        None => {}
    }
    members
}

/// Fetches a container's full membership, following `Link: rel="next"`
/// pagination and deduplicating across pages.
pub(crate) async fn list_container_members(
    client: &Client,
    container_url: &str,
) -> LdpResult<Vec<String>> {
    let mut members = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(container_url.to_string());

    while let Some(url) = next {
        let response = client
            .get(&url)
            .header("Accept", "application/ld+json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LdpError::Read {
                method: "GET",
                url,
                status: response.status().as_u16(),
            });
        }
        next = response
            .headers()
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link);
        let body: Value = response.json().await.map_err(|e| LdpError::Listing {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        for member in member_urls(&body) {
            if seen.insert(member.clone()) {
                members.push(member);
            }
        }
    }

    Ok(members)
}

/// Creates a basic container named `slug` inside `parent_url`. An existing
/// container (409) counts as success.
pub(crate) async fn create_container(
    client: &Client,
    parent_url: &str,
    slug: &str,
) -> LdpResult<()> {
    let response = client
        .post(parent_url)
        .header("Content-Type", "text/turtle")
        .header("Slug", slug)
        .header("Link", LDP_BASIC_CONTAINER_LINK)
        .body("")
        .send()
        .await?;
    let status = response.status();
    if status.is_success() || status.as_u16() == 409 {
        debug!(parent = parent_url, slug, "ensured container");
        Ok(())
    } else {
        Err(LdpError::Write {
            method: "POST",
            url: parent_url.to_string(),
            status: status.as_u16(),
        })
    }
}
