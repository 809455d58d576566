use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Why a URL was refused for fetching.
#[derive(Error, Debug)]
pub enum UrlCheckError {
    #[error("Invalid URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    Scheme(String),
    #[error("URL has no host")]
    NoHost,
    #[error("Local or private address not allowed: {0}")]
    LocalAddress(String),
}

/// Parse a URL we are about to fetch on behalf of feed data.
///
/// Only http(s) is accepted. Loopback, private and link-local hosts are
/// refused unless `allow_local` is set (used when pointing at a local
/// test server).
pub fn check_fetch_url(raw: &str, allow_local: bool) -> Result<Url, UrlCheckError> {
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlCheckError::Scheme(url.scheme().to_string()));
    }
    let host = url.host_str().ok_or(UrlCheckError::NoHost)?;
    if allow_local {
        return Ok(url);
    }

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    let is_local = bare.eq_ignore_ascii_case("localhost")
        || bare.parse::<IpAddr>().is_ok_and(|ip| is_non_public(&ip));
    if is_local {
        return Err(UrlCheckError::LocalAddress(host.to_string()));
    }
    Ok(url)
}

fn is_non_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link local
        }
    }
}
