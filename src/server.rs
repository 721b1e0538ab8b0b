//! Embedded HTTP server
//!
//! A fixed pool of worker threads pulls requests from one shared
//! `tiny_http::Server`. API requests go to [`Router`]; animal artwork is
//! served straight from the assets directory.

use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{debug, error, info, warn};
use percent_encoding::percent_decode_str;
use tiny_http::{Header, Request, Response};

use crate::api::{ApiReply, RequestContext, Router};
use crate::{Error, Result, ServiceConfig};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const ASSET_PREFIX: &str = "/assets/animals/";

pub struct Server {
    http: Arc<tiny_http::Server>,
    router: Router,
    assets_dir: PathBuf,
    workers: usize,
    stopping: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listener and prepare the router. Nothing is served until [`Server::run`].
    pub fn bind(config: ServiceConfig) -> Result<Self> {
        let http = tiny_http::Server::http(config.bind.as_str())
            .map_err(|e| Error::ConfigError(format!("Failed to bind {}: {}", config.bind, e)))?;
        let assets_dir = config.assets_dir.clone();
        let workers = config.workers.max(1);
        let router = Router::new(config)?;
        Ok(Self {
            http: Arc::new(http),
            router,
            assets_dir,
            workers,
            stopping: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Actual listening address (useful when bound to port 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.http.server_addr().to_ip()
    }

    /// Serve until [`Server::stop`] is called.
    pub fn run(&self) -> Result<()> {
        info!(
            "listening on {} with {} workers",
            self.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            self.workers
        );
        let mut handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let http = Arc::clone(&self.http);
            let router = self.router.clone();
            let assets_dir = self.assets_dir.clone();
            let stopping = Arc::clone(&self.stopping);
            let handle = thread::Builder::new()
                .name(format!("soulpet-worker-{}", id))
                .spawn(move || worker_loop(&http, &router, &assets_dir, &stopping))?;
            handles.push(handle);
        }
        for handle in handles {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }
        info!("server stopped");
        Ok(())
    }

    /// Ask all workers to exit after their current request.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        for _ in 0..self.workers {
            self.http.unblock();
        }
    }
}

fn worker_loop(http: &tiny_http::Server, router: &Router, assets_dir: &Path, stopping: &AtomicBool) {
    loop {
        match http.recv() {
            Ok(request) => handle_request(router, assets_dir, request),
            Err(e) => {
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
                warn!("failed to receive request: {}", e);
            }
        }
        if stopping.load(Ordering::SeqCst) {
            break;
        }
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn request_context(request: &Request) -> RequestContext {
    let find = |name: &str| {
        request
            .headers()
            .iter()
            .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str().to_string())
    };
    RequestContext {
        host: find("Host"),
        origin: find("Origin"),
        forwarded_proto: find("X-Forwarded-Proto"),
    }
}

fn read_body(request: &mut Request) -> std::result::Result<Vec<u8>, ApiReply> {
    let too_large = || ApiReply::fail(413, "Request body too large");
    if request.body_length().map_or(false, |len| len > MAX_BODY_BYTES) {
        return Err(too_large());
    }
    let mut body = Vec::new();
    let limit = MAX_BODY_BYTES as u64 + 1;
    if let Err(e) = request.as_reader().take(limit).read_to_end(&mut body) {
        return Err(ApiReply::unexpected(&Error::Io(e)));
    }
    if body.len() > MAX_BODY_BYTES {
        return Err(too_large());
    }
    Ok(body)
}

/// Decoded file name for a safe asset request path
pub fn asset_name(path: &str) -> Option<String> {
    let encoded = path.strip_prefix(ASSET_PREFIX)?;
    let name = percent_decode_str(encoded).decode_utf8().ok()?;
    let safe = !name.is_empty() && !name.contains(['/', '\\', '\0']) && !name.contains("..");
    (safe && name.ends_with(".png")).then(|| name.into_owned())
}

fn json_response(reply: &ApiReply) -> Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::to_vec(&reply.body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::from_data(body).with_status_code(reply.status);
    if let Some(h) = header("Content-Type", "application/json") {
        response = response.with_header(h);
    }
    response
}

fn serve_asset(assets_dir: &Path, path: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let not_found = || json_response(&ApiReply::fail(404, "Not found"));
    let Some(name) = asset_name(path) else {
        return not_found();
    };
    match std::fs::read(assets_dir.join(&name)) {
        Ok(bytes) => {
            let mut response = Response::from_data(bytes);
            for h in [header("Content-Type", "image/png"), header("Cache-Control", "public, max-age=3600")]
                .into_iter()
                .flatten()
            {
                response = response.with_header(h);
            }
            response
        }
        Err(e) => {
            debug!("asset {} unavailable: {}", name, e);
            not_found()
        }
    }
}

fn handle_request(router: &Router, assets_dir: &Path, mut request: Request) {
    let started = Instant::now();
    let method = request.method().to_string();
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or("").to_string();

    let response = if method == "GET" && path.starts_with(ASSET_PREFIX) {
        serve_asset(assets_dir, &path)
    } else if path.starts_with("/api/") {
        let ctx = request_context(&request);
        let reply = match read_body(&mut request) {
            Ok(body) => router.handle(&method, &path, &ctx, &body),
            Err(reply) => reply,
        };
        json_response(&reply)
    } else {
        json_response(&ApiReply::fail(404, "Not found"))
    };

    let status = response.status_code().0;
    if let Err(e) = request.respond(response) {
        warn!("failed to send response for {} {}: {}", method, path, e);
    }
    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        status,
        started.elapsed().as_millis()
    );
}
