//! Shared helpers for proxy integration tests
#![allow(dead_code)]

use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use throttle_proxy_lib::proxy::{
    serve, ErrorEvent, HookError, ProxyObserver, RequestContext, RequestEvent, ResponseEvent,
};
use throttle_proxy_lib::{Config, ReverseProxy};

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Response headers the test backend uses to report what it received
pub mod seen {
    pub const PATH: &str = "x-seen-path";
    pub const HOST: &str = "x-seen-host";
    pub const FORWARDED_FOR: &str = "x-seen-forwarded-for";
    pub const INTERNAL: &str = "x-seen-internal";
}

/// Find a free TCP port by binding to :0, reading the port, then releasing it.
pub fn pick_free_port() -> SocketAddr {
    let listener = StdTcpListener::bind("127.0.0.1:0")
        .unwrap_or_else(|e| panic!("failed to bind for port probe: {e}"));
    listener
        .local_addr()
        .unwrap_or_else(|e| panic!("failed to get port: {e}"))
}

/// Upstream that answers every request with 200 and `body`, echoing what it
/// received in `seen::*` headers.
pub async fn spawn_backend(body: &'static str) -> TestResult<(JoinHandle<()>, SocketAddr)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let task = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let svc = service_fn(move |req: Request<Incoming>| async move {
                    let mut resp = Response::new(Full::new(Bytes::from(body)));
                    let headers = resp.headers_mut();
                    if let Some(pq) = req.uri().path_and_query() {
                        if let Ok(v) = pq.as_str().parse::<hyper::header::HeaderValue>() {
                            headers.insert(seen::PATH, v);
                        }
                    }
                    let echoed = [
                        ("host", seen::HOST),
                        ("x-forwarded-for", seen::FORWARDED_FOR),
                        ("x-internal", seen::INTERNAL),
                    ];
                    for (from, to) in echoed {
                        if let Some(value) = req.headers().get(from) {
                            headers.insert(to, value.clone());
                        }
                    }
                    Ok::<_, Infallible>(resp)
                });
                let _ = ConnBuilder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), svc)
                    .await;
            });
        }
    });

    Ok((task, addr))
}

/// Inbound request facts as seen by a hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenContext {
    pub method: String,
    pub url: String,
    pub client: String,
    pub user_agent: String,
    pub received_at: DateTime<Utc>,
}

impl From<&RequestContext> for SeenContext {
    fn from(ctx: &RequestContext) -> Self {
        Self {
            method: ctx.method.to_string(),
            url: ctx.url.clone(),
            client: ctx.client.to_string(),
            user_agent: ctx.user_agent.clone(),
            received_at: ctx.received_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// `upstream_url` is the rewritten target
    Request { upstream_url: String, context: SeenContext },
    Response { status: u16 },
    Error { message: String },
    RateLimited { context: SeenContext },
}

/// Observer that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Recorded>>,
    fail_responses: bool,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Observer whose response hook always fails
    pub fn failing_responses() -> Arc<Self> {
        Arc::new(Self { events: Mutex::new(Vec::new()), fail_responses: true })
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.lock().clone()
    }

    pub fn requests(&self) -> usize {
        self.count(|e| matches!(e, Recorded::Request { .. }))
    }

    pub fn responses(&self) -> usize {
        self.count(|e| matches!(e, Recorded::Response { .. }))
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                Recorded::Error { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn rate_limited(&self) -> usize {
        self.count(|e| matches!(e, Recorded::RateLimited { .. }))
    }

    /// Contexts of every request hook, in order
    pub fn request_contexts(&self) -> Vec<SeenContext> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                Recorded::Request { context, .. } => Some(context.clone()),
                _ => None,
            })
            .collect()
    }

    /// Contexts of every rate limit hook, in order
    pub fn rate_limited_contexts(&self) -> Vec<SeenContext> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                Recorded::RateLimited { context } => Some(context.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&Recorded) -> bool) -> usize {
        self.lock().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: Recorded) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Recorded>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ProxyObserver for RecordingObserver {
    fn on_request(&self, event: &RequestEvent<'_>) {
        self.push(Recorded::Request {
            upstream_url: event.uri.to_string(),
            context: event.context.into(),
        });
    }

    fn on_response(&self, event: &ResponseEvent<'_>) -> Result<(), HookError> {
        self.push(Recorded::Response { status: event.status.as_u16() });
        if self.fail_responses {
            return Err(HookError::new("response sink unavailable"));
        }
        Ok(())
    }

    fn on_error(&self, event: &ErrorEvent<'_>) {
        self.push(Recorded::Error { message: event.error.to_string() });
    }

    fn on_rate_limited(&self, context: &RequestContext) {
        self.push(Recorded::RateLimited { context: context.into() });
    }
}

/// A proxy serving on an ephemeral port until the handle is dropped or
/// `shutdown` is called.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub proxy: Arc<ReverseProxy>,
    shutdown: Option<oneshot::Sender<()>>,
    pub task: JoinHandle<throttle_proxy_lib::Result<()>>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Signal shutdown and wait for the server loop to return
    pub async fn shutdown(mut self) -> TestResult<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let task = &mut self.task;
        tokio::time::timeout(Duration::from_secs(5), task).await???;
        Ok(())
    }
}

pub async fn start_proxy(
    config: &Config,
    observer: Arc<dyn ProxyObserver>,
) -> TestResult<RunningProxy> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let proxy = Arc::new(ReverseProxy::new(config, observer)?);
    let (tx, rx) = oneshot::channel::<()>();

    let task = tokio::spawn(serve(
        listener,
        proxy.clone(),
        None,
        async move {
            let _ = rx.await;
        },
        Duration::from_secs(2),
    ));

    Ok(RunningProxy { addr, proxy, shutdown: Some(tx), task })
}

/// reqwest client with a request timeout so a stuck proxy fails the test
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|e| panic!("failed to build reqwest client: {e}"))
}
