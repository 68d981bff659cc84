//! Header rewrite policy for forwarded requests.
//!
//! # Responsibilities
//! - Keep only allow-listed inbound headers
//! - Inject the route's static headers
//! - Stamp the gateway's User-Agent
//! - Strip hop-by-hop headers from backend responses
//!
//! # Design Decisions
//! - Allow-list, not deny-list: everything not named is dropped, including
//!   hop-by-hop and forwarding headers
//! - Static headers replace same-named survivors; their own values are kept
//!   in configured order
//! - The User-Agent always identifies the gateway

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::routing::Route;

/// User-Agent sent on every forwarded request.
pub const GATEWAY_USER_AGENT: &str = "Heimdall/0.1";

/// Connection-scoped headers that never cross the gateway (RFC 9110 §7.6.1).
static HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including every header named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Build the outgoing header set for `route` from the inbound headers.
pub fn rewrite_headers(inbound: &HeaderMap, route: &Route) -> HeaderMap {
    let mut outgoing = HeaderMap::new();

    for name in route.allowed_headers() {
        if outgoing.contains_key(name) {
            continue;
        }
        for value in inbound.get_all(name) {
            outgoing.append(name.clone(), value.clone());
        }
    }

    for name in route.headers().keys() {
        outgoing.remove(name);
    }
    for (name, value) in route.headers() {
        outgoing.append(name.clone(), value.clone());
    }

    outgoing.insert(header::USER_AGENT, HeaderValue::from_static(GATEWAY_USER_AGENT));
    outgoing
}
