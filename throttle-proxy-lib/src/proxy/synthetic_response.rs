use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;

use crate::proxy::ProxyBody;

pub(crate) const TOO_MANY_REQUESTS_BODY: &str = "Too Many Requests";

/// Build HTTP response with status code of 4xx and 5xx
pub(crate) fn synthetic_error_response(status_code: StatusCode) -> Response<ProxyBody> {
    let mut res = Response::new(empty_body());
    *res.status_mut() = status_code;
    res
}

/// The rejection sent to clients that exhausted their bucket
pub(crate) fn too_many_requests_response() -> Response<ProxyBody> {
    let mut res = Response::new(full_body(TOO_MANY_REQUESTS_BODY));
    *res.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    let headers = res.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    res
}

/// Box an in-memory payload into the proxy body type
pub fn full_body(data: impl Into<Bytes>) -> ProxyBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> ProxyBody {
    full_body(Bytes::new())
}
