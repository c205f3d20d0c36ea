pub mod admission;
pub mod client_pool;
pub mod context;
pub mod core;
pub mod forwarding;
pub mod headers;
pub mod http_result;
pub mod observer;
pub mod reverse_proxy;
pub mod server;
mod synthetic_response;
pub mod upstream;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;

/// Body type for requests sent upstream and responses sent to clients
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

pub use admission::Admission;
pub use client_pool::{build_client, HttpClient};
pub use context::{ErrorEvent, RequestContext, RequestEvent, ResponseEvent};
pub use self::core::ProxyCore;
pub use forwarding::{rewrite_request, RewriteOptions};
pub use http_result::HttpError;
pub use observer::{HookError, ProxyObserver, TracingObserver};
pub use reverse_proxy::ReverseProxy;
pub use server::{run, serve, shutdown_signal};
pub use synthetic_response::{empty_body, full_body};
pub use upstream::UpstreamTarget;
