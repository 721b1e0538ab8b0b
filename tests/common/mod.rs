#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};
use soulpet::rendering::raster::{encode_png, RgbaImage};
use soulpet::{Animal, ServiceConfig};
use tiny_http::{Header, Request, Response, Server};

pub const DEPLOYED: &str = "0xd00d00000000000000000000000000000000beef";
pub const SECRET: &str = "sk_test_123";

/// One request received by the fake upstream
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Seen {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub struct FakeUpstream {
    pub base: String,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeUpstream {
    pub fn requests_to(&self, suffix: &str) -> Vec<Seen> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.url.ends_with(suffix))
            .cloned()
            .collect()
    }
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str().to_string())
}

fn canned(url: &str) -> (u16, String) {
    let (status, body) = match url {
        "/v1/project-wallet/mint" => (400, json!({ "error": "insufficient funds" })),
        "/v1/project-wallet/drops/deploy" => (200, json!({ "data": { "contract": { "address": DEPLOYED } } })),
        "/v1/project-wallet/drops/claim" => (200, json!({ "txHash": "0xfeed" })),
        "/v1/project-wallet/deploy-drop/lazy-mint" => (201, json!({ "id": "asset-1" })),
        "/v1/project-wallet/deploy-drop/upload-image" => (200, json!({ "imageUrl": "https://cdn.test/asset.png" })),
        "/v1/project-wallet/deploy-drop/set-conditions" => return (200, "accepted".to_string()),
        "/v1_1/demo/image/upload" => (
            200,
            json!({ "secure_url": "https://res.test/soulpet/card.png", "public_id": "soulpet/soulpet_1" }),
        ),
        _ => (200, json!({ "ok": true })),
    };
    (status, body.to_string())
}

/// Lootex and Cloudinary stand-in on an ephemeral port
pub fn fake_upstream() -> FakeUpstream {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut raw = Vec::new();
            let _ = request.as_reader().read_to_end(&mut raw);
            let url = request.url().to_string();
            log.lock().unwrap().push(Seen {
                method: request.method().to_string(),
                url: url.clone(),
                authorization: header_value(&request, "Authorization"),
                content_type: header_value(&request, "Content-Type"),
                body: String::from_utf8_lossy(&raw).into_owned(),
            });
            let (status, body) = canned(&url);
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header("Content-Type: application/json".parse::<Header>().unwrap());
            let _ = request.respond(response);
        }
    });

    FakeUpstream {
        base: format!("http://{}", addr),
        seen,
    }
}

/// Solid-colour artwork for every animal in a fresh directory
pub fn assets_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("soulpet-{}-{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    for (i, animal) in Animal::ALL.iter().enumerate() {
        let shade = 20 + i as u8 * 25;
        let png = encode_png(&RgbaImage::filled(64, 64, (shade, 200, 90, 255))).unwrap();
        std::fs::write(dir.join(animal.asset_file_name()), png).unwrap();
    }
    dir
}

/// Configuration pointing both upstreams at `upstream`
pub fn config_for(upstream: &FakeUpstream, assets: PathBuf) -> ServiceConfig {
    let mut cfg = ServiceConfig::default();
    cfg.timeout_ms = 5000;
    cfg.workers = 2;
    cfg.assets_dir = assets;
    cfg.lootex.secret_key = Some(SECRET.into());
    cfg.lootex.api_base = upstream.base.clone();
    cfg.cloudinary.cloud_name = Some("demo".into());
    cfg.cloudinary.api_key = Some("key".into());
    cfg.cloudinary.api_secret = Some("secret".into());
    cfg.cloudinary.api_base = upstream.base.clone();
    cfg
}
