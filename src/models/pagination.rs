//! Pagination parameters and the list response envelope.
//!
//! Clients send `limit` and `offset` query parameters. The request guard
//! parses them once with [`parse_pagination_params`] so handlers never see
//! raw client values.

use serde::Serialize;

/// Bounds applied when parsing client pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOptions {
    /// Limit used when the client sends none (or garbage)
    pub default_limit: u32,

    /// Upper bound for `limit`
    pub max_limit: u32,
}

impl PaginationOptions {
    pub fn new(default_limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        }
    }
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self::new(50, 100)
    }
}

/// Sanitized `limit`/`offset` pair handed to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u64,
}

/// Parse raw `limit`/`offset` query values.
///
/// - `limit` defaults to `options.default_limit` and is clamped to `[1, max_limit]`
/// - `offset` defaults to 0 and is clamped to `>= 0`
/// - non-numeric values fall back to the defaults
/// - integers too large to represent saturate before clamping
pub fn parse_pagination_params(
    limit: Option<&str>,
    offset: Option<&str>,
    options: PaginationOptions,
) -> Pagination {
    let limit = limit
        .and_then(parse_saturating)
        .map(|value| value.clamp(1, i64::from(options.max_limit)) as u32)
        .unwrap_or(options.default_limit);

    let offset = offset
        .and_then(parse_saturating)
        .map(|value| value.max(0) as u64)
        .unwrap_or(0);

    Pagination { limit, offset }
}

/// `None` unless `raw` is an optionally signed run of digits.
fn parse_saturating(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }

    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(if negative { i64::MIN } else { i64::MAX })
}

/// Envelope for every list endpoint.
///
/// ```json
/// { "data": [...], "meta": { "total": 120, "limit": 50, "offset": 0, "hasMore": true } }
/// ```
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: u64,
    pub limit: u32,
    pub offset: u64,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, pagination: Pagination) -> Self {
        let has_more = pagination.offset + (data.len() as u64) < total;
        Self {
            data,
            meta: PaginationMeta {
                total,
                limit: pagination.limit,
                offset: pagination.offset,
                has_more,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(limit: Option<&str>, offset: Option<&str>) -> Pagination {
        parse_pagination_params(limit, offset, PaginationOptions::default())
    }

    #[test]
    fn defaults_when_absent() {
        assert_eq!(parse(None, None), Pagination { limit: 50, offset: 0 });
    }

    #[test]
    fn clamps_limit_to_bounds() {
        assert_eq!(parse(Some("500"), None).limit, 100);
        assert_eq!(parse(Some("0"), None).limit, 1);
        assert_eq!(parse(Some("-20"), None).limit, 1);
        assert_eq!(parse(Some("25"), None).limit, 25);
    }

    #[test]
    fn negative_offset_clamps_to_zero() {
        assert_eq!(parse(None, Some("-5")).offset, 0);
        assert_eq!(parse(None, Some("40")).offset, 40);
    }

    #[test]
    fn oversized_values_saturate() {
        assert_eq!(parse(Some("99999999999999999999"), None).limit, 100);
        assert_eq!(parse(Some("-99999999999999999999"), None).limit, 1);
        assert_eq!(parse(None, Some("-99999999999999999999")).offset, 0);
        assert_eq!(
            parse(None, Some("99999999999999999999")).offset,
            i64::MAX as u64
        );
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        assert_eq!(parse(Some("12abc"), Some("--3")), Pagination { limit: 50, offset: 0 });
        assert_eq!(parse(Some("lots"), Some("x")), Pagination { limit: 50, offset: 0 });
    }

    #[test]
    fn custom_max_limit_is_respected() {
        let options = PaginationOptions::new(20, 30);
        assert_eq!(parse_pagination_params(Some("31"), None, options).limit, 30);
        assert_eq!(parse_pagination_params(None, None, options).limit, 20);
    }

    #[test]
    fn envelope_reports_has_more() {
        let page = Pagination { limit: 2, offset: 0 };
        let response = PaginatedResponse::new(vec![1, 2], 3, page);
        assert!(response.meta.has_more);

        let last = PaginatedResponse::new(vec![3], 3, Pagination { limit: 2, offset: 2 });
        assert!(!last.meta.has_more);

        let json = serde_json::to_value(&last).unwrap();
        assert_eq!(json["meta"]["hasMore"], false);
        assert_eq!(json["meta"]["total"], 3);
    }
}
