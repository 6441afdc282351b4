//! Client IP extraction from HTTP headers with trust validation
//!
//! The source IP of a scan always comes from the transport, never from the
//! request body:
//! - `None` mode uses the socket peer address only
//! - `Cloudflare` mode trusts `CF-Connecting-IP`
//! - `Standard` mode walks `Forwarded` / `X-Forwarded-For` right to left,
//!   skipping configured trusted proxies

use axum::http::HeaderMap;
use std::net::IpAddr;
use tracing::warn;

use crate::config::{AnalyticsConfig, TrustedProxyMode};

/// Extract the client IP address according to the trust configuration
pub fn extract_client_ip(headers: &HeaderMap, socket_addr: IpAddr, config: &AnalyticsConfig) -> IpAddr {
    match config.trusted_proxy_mode {
        TrustedProxyMode::Cloudflare => extract_cloudflare_ip(headers).unwrap_or_else(|| {
            warn!("CF-Connecting-IP header missing in Cloudflare mode, using socket address");
            socket_addr
        }),
        TrustedProxyMode::Standard => extract_standard_ip(headers, socket_addr, config),
        TrustedProxyMode::None => socket_addr,
    }
}

/// Extract IP from Cloudflare-specific header
fn extract_cloudflare_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

fn is_trusted(ip: IpAddr, config: &AnalyticsConfig) -> bool {
    config.trusted_proxies.iter().any(|net| net.contains(&ip))
}

fn extract_standard_ip(headers: &HeaderMap, socket_addr: IpAddr, config: &AnalyticsConfig) -> IpAddr {
    // Headers from a peer outside the trusted set are attacker controlled
    if !config.trusted_proxies.is_empty() && !is_trusted(socket_addr, config) {
        return socket_addr;
    }

    // Prefer RFC 7239 Forwarded, fall back to X-Forwarded-For
    let chain = forwarded_chain(headers)
        .filter(|chain| !chain.is_empty())
        .or_else(|| x_forwarded_for_chain(headers))
        .unwrap_or_default();

    if chain.is_empty() {
        return socket_addr;
    }

    // Skip a fixed number of proxy hops from the right
    if let Some(num_trusted) = config.num_trusted_proxies {
        return if chain.len() > num_trusted {
            chain[chain.len() - num_trusted - 1]
        } else {
            // Not enough hops in the chain, use the leftmost entry
            chain[0]
        };
    }

    // First address from the right that is not one of our proxies
    if !config.trusted_proxies.is_empty() {
        return chain
            .iter()
            .rev()
            .copied()
            .find(|ip| !is_trusted(*ip, config))
            .unwrap_or(chain[0]);
    }

    chain[chain.len() - 1]
}

/// `for=` addresses of an RFC 7239 `Forwarded` header, left to right
fn forwarded_chain(headers: &HeaderMap) -> Option<Vec<IpAddr>> {
    let forwarded = headers.get("forwarded")?.to_str().ok()?;

    let chain = forwarded
        .split(',')
        .flat_map(|element| element.split(';'))
        .filter_map(|param| {
            let (key, value) = param.trim().split_once('=')?;
            key.trim().eq_ignore_ascii_case("for").then(|| parse_node(value))?
        })
        .collect();

    Some(chain)
}

/// Parse a forwarded node: `1.2.3.4`, `1.2.3.4:80`, `"[2001:db8::1]:443"`
fn parse_node(value: &str) -> Option<IpAddr> {
    let value = value.trim().trim_matches('"');

    if let Some(rest) = value.strip_prefix('[') {
        return rest.split(']').next()?.parse().ok();
    }
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }
    value.split_once(':')?.0.parse().ok()
}

fn x_forwarded_for_chain(headers: &HeaderMap) -> Option<Vec<IpAddr>> {
    let xff = headers.get("x-forwarded-for")?.to_str().ok()?;

    Some(xff.split(',').filter_map(parse_node).collect())
}
