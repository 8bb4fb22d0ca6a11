//! HTTP host for the response interceptor.
//!
//! `tiny_http` accepts connections; each request is handed to a rayon pool
//! so a slow transcode never blocks other requests.

mod lifecycle;
mod response;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tiny_http::{Request, Server};

use crate::config::PixConfig;
use crate::core::{CancelToken, is_shutdown, register_server};
use crate::intercept::{Downstream, IncomingRequest, Interceptor, StaticRoot, Upstream};
use crate::transcode::{DiskFetcher, Fetch, HttpFetcher, Transcoder, open_store};
use crate::url_codec::Origin;
use crate::log;

/// Bind, then serve until Ctrl+C.
pub fn serve(config: Arc<PixConfig>) -> Result<()> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));

    let interceptor = build_interceptor(&config, addr)?;

    log!("serve"; "http://{}", addr);
    match config.upstream() {
        Some(upstream) => log!("serve"; "proxying {}", upstream),
        None => log!("serve"; "serving {}", config.serve.root.display()),
    }

    run_request_loop(&server, &interceptor, &config)
}

/// Wire fetcher, downstream, cache and transcoder from configuration.
fn build_interceptor(config: &PixConfig, addr: SocketAddr) -> Result<Interceptor> {
    let registry = Arc::new(config.registry());

    let (fetcher, downstream): (Arc<dyn Fetch>, Box<dyn Downstream>) = match config.upstream() {
        Some(upstream) => {
            let client = reqwest::blocking::Client::builder()
                .user_agent(concat!("pixshift/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("failed to build HTTP client")?;
            (
                Arc::new(HttpFetcher::new(client.clone(), upstream)) as Arc<dyn Fetch>,
                Box::new(Upstream::new(client, upstream)) as Box<dyn Downstream>,
            )
        }
        None => (
            Arc::new(DiskFetcher::new(&config.serve.root)) as Arc<dyn Fetch>,
            Box::new(StaticRoot::new(&config.serve.root)) as Box<dyn Downstream>,
        ),
    };

    let mut transcoder = Transcoder::new(fetcher, Arc::clone(&registry), config.encode_settings());
    if let Some(cache) = open_store(&config.cache) {
        transcoder = transcoder.with_cache(cache);
    }

    Ok(Interceptor::new(
        config.url_codec(),
        registry,
        transcoder,
        downstream,
        Origin::new("http", &addr.to_string()),
    ))
}

/// Serve until the server is unblocked, then wait for in-flight requests.
fn run_request_loop(server: &Server, interceptor: &Interceptor, config: &PixConfig) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.serve.threads)
        .build()
        .context("failed to create thread pool")?;
    let timeout = Duration::from_secs(config.serve.request_timeout);

    dispatch_all(&pool, server.incoming_requests(), |request| {
        if let Err(e) = handle_request(request, interceptor, timeout) {
            log!("serve"; "request error: {e}");
        }
    });
    Ok(())
}

/// Run `handle` on `pool` for every item; returns once all have finished.
fn dispatch_all<T: Send>(
    pool: &rayon::ThreadPool,
    items: impl IntoIterator<Item = T>,
    handle: impl Fn(T) + Sync,
) {
    let handle = &handle;
    pool.in_place_scope(|scope| {
        for item in items {
            scope.spawn(move |_| handle(item));
        }
    });
}

fn handle_request(request: Request, interceptor: &Interceptor, timeout: Duration) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    let incoming = to_incoming(&request);
    let cancel = CancelToken::with_timeout(timeout);
    let reply = interceptor.handle(&incoming, &cancel);
    response::send_reply(request, reply)
}

fn to_incoming(request: &Request) -> IncomingRequest {
    IncomingRequest {
        method: request.method().as_str().to_string(),
        url: request.url().to_string(),
        headers: request
            .headers()
            .iter()
            .map(|h| (h.field.as_str().as_str().to_string(), h.value.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use std::fs;
    use tiny_http::{Header, Method, TestRequest};

    #[test]
    fn test_dispatch_waits_for_in_flight_jobs() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let done = AtomicUsize::new(0);
        dispatch_all(&pool, 0..8, |_| {
            std::thread::sleep(Duration::from_millis(20));
            done.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(done.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_to_incoming() {
        let request: Request = TestRequest::new()
            .with_method(Method::Head)
            .with_path("/a.jpg?v=1")
            .with_header(Header::from_bytes("Host", "example.com").unwrap())
            .into();
        let incoming = to_incoming(&request);

        assert!(incoming.is_head());
        assert_eq!(incoming.url, "/a.jpg?v=1");
        assert_eq!(incoming.header("host"), Some("example.com"));
    }

    #[test]
    fn test_interceptor_serves_static_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<img src=\"/a.jpg\">").unwrap();

        let mut config = test_parse_config("[cache]\nenable = false\n[output]\njxl = false\nwebp = false");
        config.serve.root = dir.path().to_path_buf();
        let addr: SocketAddr = "127.0.0.1:5288".parse().unwrap();
        let interceptor = build_interceptor(&config, addr).unwrap();

        let reply = interceptor.handle(&IncomingRequest::get("/"), &CancelToken::none());
        assert_eq!(reply.status, 200);
        assert_eq!(
            String::from_utf8(reply.body).unwrap(),
            "<picture><source srcset=\"/a.jpg.pixshift.avif\" type=\"image/avif\"/><img src=\"/a.jpg\"/></picture>"
        );
    }
}
