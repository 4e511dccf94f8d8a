//! Conditional and partial responses over a buffered body
//!
//! Everything here slices the one `Bytes` buffer held by the response, so
//! a 206 never copies audio data.

use crate::edge_cache::CachedResponse;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::Response;

/// Outcome of a `Range` header against a body of known length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range: serve everything
    Full,
    /// Inclusive bounds
    Partial { start: u64, end: u64 },
    /// Syntactically valid but outside the body
    Unsatisfiable,
}

/// Interprets a single `bytes=` range.
///
/// Multi-range and malformed headers fall back to [`ByteRange::Full`].
pub fn parse_range(value: &str, total: u64) -> ByteRange {
    let Some(ranges) = value.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if ranges.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = ranges.split_once('-') else {
        return ByteRange::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // suffix: the last n bytes
        let Ok(n) = last.parse::<u64>() else {
            return ByteRange::Full;
        };
        if n == 0 || total == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: total.saturating_sub(n),
            end: total - 1,
        };
    }

    let Ok(start) = first.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if last.is_empty() {
        None
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return ByteRange::Full,
        }
    };

    if start >= total {
        return ByteRange::Unsatisfiable;
    }
    ByteRange::Partial {
        start,
        end: end.map_or(total - 1, |end| end.min(total - 1)),
    }
}

/// `If-None-Match` matches the current tag (weak comparison)
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let strip = |tag: &str| tag.trim().trim_start_matches("W/").to_string();
    let etag = strip(etag);
    if_none_match
        .split(',')
        .any(|candidate| candidate.trim() == "*" || strip(candidate) == etag)
}

/// Builds the HTTP response for `cached`, honouring the conditional and
/// range headers of the request.
pub fn respond(cached: CachedResponse, request: &HeaderMap) -> Response {
    if !cached.status.is_success() {
        return full_response(cached);
    }

    let etag = cached
        .headers
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok());
    let if_none_match = request
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    if let (Some(etag), Some(condition)) = (etag, if_none_match) {
        if etag_matches(condition, etag) {
            return not_modified(cached);
        }
    }

    let range = request
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_range(v, cached.body.len() as u64))
        .unwrap_or(ByteRange::Full);

    match range {
        ByteRange::Full => full_response(cached),
        ByteRange::Partial { start, end } => partial_response(cached, start, end),
        ByteRange::Unsatisfiable => unsatisfiable(cached),
    }
}

fn build(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn full_response(cached: CachedResponse) -> Response {
    build(cached.status, cached.headers, Body::from(cached.body))
}

fn not_modified(cached: CachedResponse) -> Response {
    let mut headers = cached.headers;
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_TYPE);
    build(StatusCode::NOT_MODIFIED, headers, Body::empty())
}

fn partial_response(cached: CachedResponse, start: u64, end: u64) -> Response {
    let total = cached.body.len();
    let body = cached.body.slice(start as usize..=end as usize);

    let mut headers = cached.headers;
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    headers.insert(
        header::CONTENT_RANGE,
        header_value(format!("bytes {}-{}/{}", start, end, total)),
    );
    build(StatusCode::PARTIAL_CONTENT, headers, Body::from(body))
}

fn unsatisfiable(cached: CachedResponse) -> Response {
    let total = cached.body.len();
    let mut headers = cached.headers;
    headers.remove(header::CONTENT_TYPE);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
    headers.insert(
        header::CONTENT_RANGE,
        header_value(format!("bytes */{}", total)),
    );
    build(StatusCode::RANGE_NOT_SATISFIABLE, headers, Body::empty())
}

fn header_value(value: String) -> HeaderValue {
    // digits, spaces, '-', '/' and '*' only
    HeaderValue::try_from(value).unwrap_or_else(|_| HeaderValue::from_static("bytes */0"))
}
