// ABOUTME: Key derivation for rate limiting: client IP, authenticated user, endpoint, or composite
// ABOUTME: Forwarded-header precedence is X-Forwarded-For > X-Real-IP > X-Client-IP
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::config::KeyGenerator;

/// Inputs available when deriving a rate-limit key. All fields are optional
/// since not every request carries every piece (an unauthenticated request
/// has no `user_id`, a non-HTTP caller has no headers).
#[derive(Debug, Clone, Default)]
pub struct KeyInput<'a> {
    pub forwarded_for: Option<&'a str>,
    pub real_ip: Option<&'a str>,
    pub client_ip_header: Option<&'a str>,
    pub remote_addr: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub method: Option<&'a str>,
    pub path: Option<&'a str>,
}

/// Resolves the client IP from forwarded headers, preferring the
/// left-most address in `X-Forwarded-For` (the original client) over the
/// single-hop alternatives, falling back to the connection's remote address.
#[must_use]
pub fn client_ip(input: &KeyInput<'_>) -> Option<String> {
    if let Some(xff) = input.forwarded_for {
        if let Some(first) = xff.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    if let Some(ip) = input.real_ip {
        if !ip.is_empty() {
            return Some(ip.to_string());
        }
    }
    if let Some(ip) = input.client_ip_header {
        if !ip.is_empty() {
            return Some(ip.to_string());
        }
    }
    input.remote_addr.map(str::to_string)
}

/// Derives the bucket key for a given strategy. Unresolvable inputs (e.g. no
/// IP available for an `Ip` key) fall back to `"unknown"` rather than
/// panicking, so limiting degrades to a shared bucket instead of failing.
#[must_use]
pub fn derive_key(generator: KeyGenerator, input: &KeyInput<'_>) -> String {
    match generator {
        KeyGenerator::Ip => client_ip(input).unwrap_or_else(|| "unknown".to_string()),
        KeyGenerator::User => input.user_id.unwrap_or("unknown").to_string(),
        KeyGenerator::Endpoint => format!(
            "{}:{}",
            input.method.unwrap_or("unknown"),
            input.path.unwrap_or("unknown")
        ),
        KeyGenerator::Composite => format!(
            "{}:{}:{}",
            client_ip(input).unwrap_or_else(|| "unknown".to_string()),
            input.user_id.unwrap_or("anon"),
            input.path.unwrap_or("unknown")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_takes_precedence() {
        let input = KeyInput {
            forwarded_for: Some("1.1.1.1, 2.2.2.2"),
            real_ip: Some("3.3.3.3"),
            ..Default::default()
        };
        assert_eq!(client_ip(&input).as_deref(), Some("1.1.1.1"));
    }

    #[test]
    fn real_ip_used_when_forwarded_for_absent() {
        let input = KeyInput {
            real_ip: Some("3.3.3.3"),
            client_ip_header: Some("4.4.4.4"),
            ..Default::default()
        };
        assert_eq!(client_ip(&input).as_deref(), Some("3.3.3.3"));
    }

    #[test]
    fn falls_back_to_remote_addr() {
        let input = KeyInput {
            remote_addr: Some("5.5.5.5"),
            ..Default::default()
        };
        assert_eq!(client_ip(&input).as_deref(), Some("5.5.5.5"));
    }

    #[test]
    fn endpoint_key_combines_method_and_path() {
        let input = KeyInput {
            method: Some("GET"),
            path: Some("/v1/stream"),
            ..Default::default()
        };
        assert_eq!(derive_key(KeyGenerator::Endpoint, &input), "GET:/v1/stream");
    }
}
