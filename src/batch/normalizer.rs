//! Response normalizer: every [`RawOutcome`] maps to exactly one [`ResponseRecord`].

use crate::transport::{RawOutcome, RawResponse};
use crate::types::{Cookie, ErrorInfo, RequestDescriptor, ResponseRecord};
use std::collections::BTreeMap;

/// Shape a raw transport outcome into the canonical record for `request`.
///
/// Total and side-effect free.
pub fn normalize(raw: RawOutcome, request: RequestDescriptor) -> ResponseRecord {
    match raw {
        RawOutcome::Error(err) => ResponseRecord {
            url: request.url.clone(),
            body: err.message.clone(),
            status: err.code.trim().parse().unwrap_or(0),
            headers: BTreeMap::new(),
            cookies: Vec::new(),
            error: Some(ErrorInfo::new(err.code, err.message)),
            args: request,
        },
        RawOutcome::Exception(e) => {
            let code = e.code();
            let message = e.to_string();
            ResponseRecord {
                url: request.url.clone(),
                body: message.clone(),
                status: code,
                headers: BTreeMap::new(),
                cookies: Vec::new(),
                error: Some(ErrorInfo::new(format!("http_request_failed_{}", code), message)),
                args: request,
            }
        }
        RawOutcome::Response(resp) => success(resp, request),
    }
}

fn success(resp: RawResponse, request: RequestDescriptor) -> ResponseRecord {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    let mut cookies = Vec::new();
    for (name, value) in resp.headers {
        let name = name.to_ascii_lowercase();
        if name == "set-cookie" {
            cookies.extend(Cookie::parse_set_cookie(&value));
        }
        headers
            .entry(name)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    ResponseRecord {
        url: request.url.clone(),
        body: String::from_utf8_lossy(&resp.body).into_owned(),
        status: resp.status.filter(|s| *s != 0).unwrap_or(200),
        headers,
        cookies,
        error: None,
        args: request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{PlatformError, TransportError};

    fn req() -> RequestDescriptor {
        RequestDescriptor::get("https://x/1")
    }

    #[test]
    fn platform_error_takes_status_from_code() {
        let record = normalize(PlatformError::new("503", "unavailable").into(), req());
        assert_eq!(record.status, 503);
        assert_eq!(record.body, "unavailable");
        assert_eq!(record.error, Some(ErrorInfo::new("503", "unavailable")));
        assert!(record.headers.is_empty());
    }

    #[test]
    fn non_numeric_platform_code_yields_zero_status() {
        let record = normalize(
            PlatformError::new("http_request_failed", "blocked by policy").into(),
            req(),
        );
        assert_eq!(record.status, 0);
        assert_eq!(record.error.unwrap().code, "http_request_failed");
    }

    #[test]
    fn exception_synthesizes_error_info() {
        let record = normalize(
            TransportError::Connect("connection refused".into()).into(),
            req(),
        );
        assert_eq!(record.status, 7);
        assert_eq!(record.body, "connection failed: connection refused");
        let info = record.error.unwrap();
        assert_eq!(info.code, "http_request_failed_7");
        assert_eq!(info.message, "connection failed: connection refused");
        assert_eq!(record.args, req());
    }

    #[test]
    fn success_defaults_status_to_200() {
        let missing = normalize(
            RawResponse {
                status: None,
                headers: Vec::new(),
                body: "A".into(),
            }
            .into(),
            req(),
        );
        assert_eq!(missing.status, 200);
        assert_eq!(missing.body, "A");
        assert!(missing.error.is_none());

        let zero = normalize(RawResponse::new(0, "").into(), req());
        assert_eq!(zero.status, 200);

        let not_found = normalize(RawResponse::new(404, "").into(), req());
        assert_eq!(not_found.status, 404);
        assert!(not_found.error.is_none());
    }

    #[test]
    fn success_collects_headers_and_cookies() {
        let record = normalize(
            RawResponse::new(200, "ok")
                .with_header("Content-Type", "text/plain")
                .with_header("Set-Cookie", "a=1; Path=/")
                .with_header("set-cookie", "b=2; HttpOnly")
                .into(),
            req(),
        );
        assert_eq!(record.header("content-type"), Some("text/plain"));
        assert_eq!(record.header("set-cookie"), Some("a=1; Path=/, b=2; HttpOnly"));
        let names: Vec<_> = record.cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(record.cookies[1].http_only);
    }

    #[test]
    fn body_is_decoded_lossily() {
        let record = normalize(RawResponse::new(200, vec![0x66, 0xff, 0x6f]).into(), req());
        assert_eq!(record.body, "f\u{fffd}o");
    }
}
