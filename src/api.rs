//! Route handlers, independent of the HTTP transport.
//!
//! Every handler takes the request body as JSON and answers with an
//! [`ApiReply`]: an HTTP status plus a JSON envelope of the form
//! `{ "success": bool, "message": ..., "data": ..., "error": ... }`.
//! Upstream failures keep the upstream status and carry its body in `data`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::cloudinary::CloudinaryClient;
use crate::lootex::{
    self, Attribute, ClaimPayload, DeployContractPayload, LazyMintPayload, LootexClient, MintPayload,
    OverrideMetadata, SetConditionsPayload, Upstream,
};
use crate::quiz::{self, Animal, AnswerSet, QUESTIONS};
use crate::rendering::{today_utc, CardRenderer, ResultImage};
use crate::{Error, Result, ServiceConfig};

/// Link shown on minted tokens
pub const EXTERNAL_URL: &str = "https://www.lootexplus.com/";

/// Status and JSON body produced by a handler
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// `{success: false, message}` with the given status
    pub fn fail(status: u16, message: &str) -> Self {
        Self::new(status, json!({ "success": false, "message": message }))
    }

    /// Relay a failed upstream call with its status and body
    pub fn upstream_failure(message: &str, upstream: Upstream) -> Self {
        Self::new(
            upstream.status,
            json!({ "success": false, "message": message, "data": upstream.data }),
        )
    }

    pub fn unexpected(err: &Error) -> Self {
        Self::internal("Unexpected error", err)
    }

    /// 500 with a route-specific message and the error text
    pub fn internal(message: &str, err: &Error) -> Self {
        Self::new(
            500,
            json!({ "success": false, "message": message, "error": err.to_string() }),
        )
    }

    /// Map a handler error onto the envelope.
    pub fn from_error(err: &Error) -> Self {
        Self::from_route_error("", err)
    }

    /// Like [`ApiReply::from_error`], using the route's own message for internal failures.
    pub fn from_route_error(route: &str, err: &Error) -> Self {
        match err {
            Error::Validation(msg) => Self::fail(400, msg),
            Error::Misconfigured(_) => Self::fail(500, &err.to_string()),
            _ => {
                error!("request to {} failed: {}", route, err);
                Self::internal(internal_failure_message(route), err)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `success: true` in the body
    pub fn succeeded(&self) -> bool {
        self.body.get("success").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

/// Request headers the handlers care about
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub host: Option<String>,
    pub origin: Option<String>,
    pub forwarded_proto: Option<String>,
}

impl RequestContext {
    /// `{proto}://{host}` from `Host` and `X-Forwarded-Proto`
    fn host_base(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        let proto = self.forwarded_proto.as_deref().unwrap_or("http");
        Some(format!("{}://{}", proto, host))
    }

    /// `Origin` when it is an http(s) URL, else `http://{host}`
    fn origin_base(&self) -> Option<String> {
        match self.origin.as_deref() {
            Some(o) if o.starts_with("http") => Some(o.to_string()),
            _ => self.host.as_deref().map(|h| format!("http://{}", h)),
        }
    }
}

/// URL of `{base}/assets/animals/{file_name}` with the file name percent-encoded.
/// An unusable base yields a root-relative path.
pub fn asset_url(base: Option<&str>, file_name: &str) -> String {
    let parsed = base.and_then(|b| Url::parse(b).ok());
    let relative = parsed.is_none();
    let mut url = match parsed {
        Some(u) => u,
        None => match Url::parse("http://localhost/") {
            Ok(u) => u,
            Err(_) => return format!("/assets/animals/{}", file_name),
        },
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(["assets", "animals", file_name]);
    }
    if relative {
        url.path().to_string()
    } else {
        url.to_string()
    }
}

/// JS-style `Number(value || default)` for loosely typed numeric fields.
fn number_or(field: &str, value: &Option<Value>, default: u64) -> Result<u64> {
    let invalid = || Error::Validation(format!("{} must be a number", field));
    match value {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(false)) => Ok(default),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(0) => Ok(default),
            Some(v) => Ok(v),
            None => n
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
                .ok_or_else(invalid),
        },
        Some(Value::String(s)) if s.trim().is_empty() => Ok(default),
        Some(Value::String(s)) => match s.trim().parse::<u64>() {
            Ok(0) => Ok(default),
            Ok(v) => Ok(v),
            Err(_) => Err(invalid()),
        },
        Some(_) => Err(invalid()),
    }
}

fn optional_number(field: &str, value: &Option<Value>) -> Result<Option<u64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) if n.as_u64() == Some(0) => Ok(Some(0)),
        Some(Value::String(s)) if s.trim() == "0" => Ok(Some(0)),
        Some(_) => number_or(field, value, 0).map(Some),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("rejecting request body: {}", e);
        Error::Validation("Invalid JSON body".into())
    })
}

/// A bare file stem such as `Fox`, with no separators or traversal.
fn is_plain_stem(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\']) && !s.contains("..")
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadImageRequest {
    image_base64: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintRequest {
    wallet_address: Option<String>,
    metadata_uri: Option<String>,
    user_name: Option<String>,
    animal_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployContractRequest {
    chain_id: Option<Value>,
    image_url: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
    is_creator_fee: Option<bool>,
    creator_fee_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LazyMintRequest {
    chain_id: Option<Value>,
    contract_id: Option<String>,
    asset_name: Option<String>,
    asset_description: Option<String>,
    asset_image_url: Option<String>,
    amount: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetConditionsRequest {
    chain_id: Option<Value>,
    contract_id: Option<String>,
    price: Option<Value>,
    currency_address: Option<String>,
    amount: Option<Value>,
    start_time: Option<String>,
    end_time: Option<String>,
    limit_per_wallet: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployDropImageRequest {
    animal: Option<String>,
    asset_name: Option<String>,
    file_path_override: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRequest {
    recipient_address: Option<String>,
    contract_address: Option<String>,
    user_name: Option<String>,
    animal_type: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScoreRequest {
    answers: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultImageRequest {
    user_name: Option<String>,
    animal: Option<String>,
    date: Option<String>,
}

/// Dispatches API routes to their handlers
#[derive(Clone)]
pub struct Router {
    config: Arc<ServiceConfig>,
    lootex: Option<LootexClient>,
    cloudinary: Option<CloudinaryClient>,
    renderer: CardRenderer,
}

impl Router {
    /// Build the router; upstream clients are created once for configured credentials.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let lootex = match LootexClient::new(&config.lootex, timeout) {
            Ok(c) => Some(c),
            Err(Error::Misconfigured(var)) => {
                warn!("{} is not set; Lootex routes will answer 500", var);
                None
            }
            Err(e) => return Err(e),
        };
        let cloudinary = match CloudinaryClient::new(&config.cloudinary, timeout) {
            Ok(c) => Some(c),
            Err(Error::Misconfigured(var)) => {
                warn!("{} is not set; image uploads are disabled", var);
                None
            }
            Err(e) => return Err(e),
        };
        let renderer = CardRenderer::new(config.assets_dir.clone());
        Ok(Self {
            config: Arc::new(config),
            lootex,
            cloudinary,
            renderer,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn lootex(&self) -> Result<&LootexClient> {
        self.lootex.as_ref().ok_or(Error::Misconfigured("LOOTEX_SECRET_KEY"))
    }

    /// Whether `path` names an API route (for any method)
    pub fn has_route(path: &str) -> bool {
        ROUTES.iter().any(|(_, p)| *p == path)
    }

    /// Handle one API request. `path` may carry a query string.
    pub fn handle(&self, method: &str, path: &str, ctx: &RequestContext, body: &[u8]) -> ApiReply {
        let path = path.split('?').next().unwrap_or(path);
        let method = method.to_ascii_uppercase();
        let Some((_, route)) = ROUTES.iter().find(|(m, p)| *m == method && *p == path) else {
            return if Self::has_route(path) {
                ApiReply::fail(405, "Method not allowed")
            } else {
                ApiReply::fail(404, "Not found")
            };
        };

        let result = match *route {
            "/api/upload-image" => return self.upload_image(body),
            "/api/upload-metadata" => self.upload_metadata(body),
            "/api/mint" => self.mint(ctx, body),
            "/api/deploy-drop/deploy-contract" => self.deploy_contract(body),
            "/api/deploy-drop/lazy-mint" => self.lazy_mint(body),
            "/api/deploy-drop/set-conditions" => self.set_conditions(body),
            "/api/deploy-drop/upload-image" => self.deploy_drop_upload_image(body),
            "/api/drops/deploy" => self.drops_deploy(body),
            "/api/drops/claim" => self.drops_claim(ctx, body),
            "/api/quiz/questions" => Ok(self.quiz_questions()),
            "/api/quiz/score" => self.quiz_score(body),
            "/api/result/image" => self.result_image(body),
            _ => Ok(ApiReply::fail(404, "Not found")),
        };
        result.unwrap_or_else(|e| ApiReply::from_route_error(route, &e))
    }

    /// POST /api/upload-image: host a rendered card on Cloudinary.
    fn upload_image(&self, body: &[u8]) -> ApiReply {
        let req: UploadImageRequest = match parse_body(body) {
            Ok(r) => r,
            Err(e) => return ApiReply::from_error(&e),
        };
        let Some(image) = non_empty(&req.image_base64) else {
            return ApiReply::fail(400, "Missing image data");
        };
        let uploaded = self
            .cloudinary
            .as_ref()
            .ok_or(Error::Misconfigured("CLOUDINARY_CLOUD_NAME"))
            .and_then(|c| c.upload_data_url(image));
        match uploaded {
            Ok(u) => ApiReply::ok(json!({
                "success": true,
                "imageUrl": u.secure_url,
                "publicId": u.public_id,
            })),
            Err(e) => {
                error!("image upload error: {}", e);
                ApiReply::fail(500, "Image upload failed")
            }
        }
    }

    /// POST /api/upload-metadata: accept metadata locally, the image doubles as its URI.
    fn upload_metadata(&self, body: &[u8]) -> Result<ApiReply> {
        let metadata: Value = parse_body(body)?;
        let field = |k: &str| metadata.get(k).and_then(Value::as_str).filter(|s| !s.is_empty());
        let (Some(_), Some(image)) = (field("name"), field("image")) else {
            return Err(Error::Validation("name and image are required in metadata".into()));
        };
        let reply = json!({
            "success": true,
            "message": "Metadata accepted",
            "data": { "uri": image, "preview": metadata },
        });
        info!("upload-metadata accepted for {}", image);
        Ok(ApiReply::ok(reply))
    }

    /// POST /api/mint: optional lazy-mint of the user's asset, then a server-wallet mint.
    fn mint(&self, ctx: &RequestContext, body: &[u8]) -> Result<ApiReply> {
        let client = self.lootex()?;
        let lootex_cfg = &self.config.lootex;
        let contract_address = lootex_cfg
            .contract_address
            .clone()
            .ok_or(Error::Misconfigured("LOOTEX_CONTRACT_ADDRESS"))?;
        let req: MintRequest = parse_body(body)?;
        let wallet = non_empty(&req.wallet_address)
            .ok_or_else(|| Error::Validation("walletAddress is required".into()))?;

        let user = non_empty(&req.user_name).unwrap_or("User");
        let animal = non_empty(&req.animal_type).unwrap_or("Cat");
        info!(
            "mint request: wallet={} user={} animal={} metadataUri={:?} chain={} contract={} contractId={:?}",
            wallet,
            user,
            animal,
            req.metadata_uri,
            client.chain_id(),
            contract_address,
            lootex_cfg.contract_id
        );

        if let Some(contract_id) = &lootex_cfg.contract_id {
            let base = ctx
                .host_base()
                .or_else(|| self.config.public_url.clone())
                .unwrap_or_else(|| "http://localhost:3000".to_string());
            let payload = LazyMintPayload {
                chain_id: client.chain_id(),
                contract_id: contract_id.clone(),
                asset_name: format!("{}'s Soulpet: {}", user, animal),
                asset_description: Some(format!("Soulpet result for {} on {}.", user, today_utc())),
                asset_image_url: asset_url(Some(&base), &format!("{}.png", animal)),
                amount: 1,
            };
            let upstream = client.lazy_mint(&payload)?;
            if !upstream.is_success() {
                return Ok(ApiReply::upstream_failure("Lootex lazy-mint API failed", upstream));
            }
            info!("lazy-mint created for {}", payload.asset_name);
        }

        let upstream = client.mint(&MintPayload {
            chain_id: client.chain_id(),
            contract_address,
            recipient_address: wallet.to_string(),
            quantity: 1,
        })?;
        if !upstream.is_success() {
            return Ok(ApiReply::upstream_failure("Lootex mint API failed", upstream));
        }
        Ok(ApiReply::ok(json!({
            "success": true,
            "message": "NFT minted successfully",
            "data": upstream.data,
        })))
    }

    /// POST /api/deploy-drop/deploy-contract
    fn deploy_contract(&self, body: &[u8]) -> Result<ApiReply> {
        let client = self.lootex()?;
        let req: DeployContractRequest = parse_body(body)?;
        let (Some(image_url), Some(name), Some(symbol)) =
            (non_empty(&req.image_url), non_empty(&req.name), non_empty(&req.symbol))
        else {
            return Err(Error::Validation("imageUrl, name, symbol are required".into()));
        };
        let payload = DeployContractPayload {
            chain_id: number_or("chainId", &req.chain_id, client.chain_id())?,
            image_url: image_url.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            is_creator_fee: req.is_creator_fee.unwrap_or(false),
            creator_fee_address: req.creator_fee_address.clone(),
        };
        let upstream = client.deploy_contract(&payload)?;
        Ok(relay(upstream, "Deploy contract failed", "Contract deployed"))
    }

    /// POST /api/deploy-drop/lazy-mint
    fn lazy_mint(&self, body: &[u8]) -> Result<ApiReply> {
        let client = self.lootex()?;
        let req: LazyMintRequest = parse_body(body)?;
        let (Some(contract_id), Some(asset_name), Some(image_url)) = (
            non_empty(&req.contract_id),
            non_empty(&req.asset_name),
            non_empty(&req.asset_image_url),
        ) else {
            return Err(Error::Validation(
                "contractId, assetName, assetImageUrl are required".into(),
            ));
        };
        let payload = LazyMintPayload {
            chain_id: number_or("chainId", &req.chain_id, client.chain_id())?,
            contract_id: contract_id.to_string(),
            asset_name: asset_name.to_string(),
            asset_description: req.asset_description.clone(),
            asset_image_url: image_url.to_string(),
            amount: number_or("amount", &req.amount, 1)?,
        };
        let upstream = client.lazy_mint(&payload)?;
        Ok(relay(upstream, "Lazy mint failed", "Lazy mint created"))
    }

    /// POST /api/deploy-drop/set-conditions
    fn set_conditions(&self, body: &[u8]) -> Result<ApiReply> {
        let client = self.lootex()?;
        let req: SetConditionsRequest = parse_body(body)?;
        let price = match &req.price {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let (Some(contract_id), Some(price)) = (non_empty(&req.contract_id), price) else {
            return Err(Error::Validation("contractId, price, amount are required".into()));
        };
        let payload = SetConditionsPayload {
            chain_id: number_or("chainId", &req.chain_id, client.chain_id())?,
            contract_id: contract_id.to_string(),
            price,
            currency_address: req.currency_address.clone(),
            amount: number_or("amount", &req.amount, 0)?,
            start_time: req.start_time.clone(),
            end_time: req.end_time.clone(),
            limit_per_wallet: optional_number("limitPerWallet", &req.limit_per_wallet)?,
        };
        let upstream = client.set_conditions(&payload)?;
        Ok(relay(upstream, "Set conditions failed", "Conditions updated"))
    }

    /// Resolve the artwork to upload, keeping overrides inside the project root.
    fn resolve_artwork(&self, animal: Option<&str>, file_override: Option<&str>) -> Result<PathBuf> {
        if let Some(p) = file_override {
            let candidate = Path::new(p);
            let joined = if candidate.is_absolute() {
                candidate.to_path_buf()
            } else {
                self.config.project_root.join(candidate)
            };
            if joined.components().any(|c| matches!(c, Component::ParentDir)) {
                return Err(Error::Validation("filePathOverride must not contain '..'".into()));
            }
            let root = self.config.project_root.canonicalize()?;
            let resolved = joined.canonicalize()?;
            if !resolved.starts_with(&root) {
                return Err(Error::Validation("filePathOverride must stay inside the project".into()));
            }
            return Ok(resolved);
        }
        match animal {
            Some(a) if is_plain_stem(a) => Ok(self.config.assets_dir.join(format!("{}.png", a))),
            _ => Err(Error::Validation("animal must be a plain name".into())),
        }
    }

    /// POST /api/deploy-drop/upload-image: send local artwork to Lootex as multipart.
    fn deploy_drop_upload_image(&self, body: &[u8]) -> Result<ApiReply> {
        let req: DeployDropImageRequest = parse_body(body)?;
        let animal = non_empty(&req.animal);
        let file_override = non_empty(&req.file_path_override);
        if animal.is_none() && file_override.is_none() {
            return Err(Error::Validation("animal or filePathOverride is required".into()));
        }
        let client = self.lootex()?;
        let path = self.resolve_artwork(animal, file_override)?;
        let bytes = std::fs::read(&path)?;
        let file_name = format!("{}.png", animal.unwrap_or("asset"));
        let asset_name = non_empty(&req.asset_name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Soulpet {}", animal.unwrap_or("Asset")));
        let upstream = client.upload_image(&file_name, bytes, &asset_name)?;
        Ok(relay(upstream, "Upload image failed", "Image uploaded"))
    }

    /// POST /api/drops/deploy: deploy a drop from defaults merged with the body.
    fn drops_deploy(&self, body: &[u8]) -> Result<ApiReply> {
        let client = self.lootex()?;
        let overrides: Value = serde_json::from_slice(body).unwrap_or_else(|_| json!({}));
        let payload = lootex::merge_overrides(lootex::default_drop_payload(client.chain_id()), &overrides);
        let upstream = client.deploy_drop(&payload)?;
        if !upstream.is_success() {
            return Ok(ApiReply::upstream_failure("Deploy failed", upstream));
        }
        let used = lootex::extract_contract_address(&upstream.data);
        match &used {
            Some(addr) => info!("drop deployed at {}", addr),
            None => warn!("drop deployed but no contract address found in response"),
        }
        Ok(ApiReply::ok(json!({
            "success": true,
            "message": "Deploy success",
            "usedContractAddress": used,
            "data": upstream.data,
        })))
    }

    /// POST /api/drops/claim: claim one token with per-user override metadata.
    fn drops_claim(&self, ctx: &RequestContext, body: &[u8]) -> Result<ApiReply> {
        let client = self.lootex()?;
        let req: ClaimRequest = parse_body(body)?;
        let contract_address = non_empty(&req.contract_address)
            .map(str::to_string)
            .or_else(|| self.config.lootex.contract_address.clone())
            .ok_or_else(|| Error::Validation("Missing contractAddress (env or body)".into()))?;
        let recipient = non_empty(&req.recipient_address)
            .ok_or_else(|| Error::Validation("recipientAddress is required".into()))?;

        let user = non_empty(&req.user_name);
        let animal = non_empty(&req.animal_type);
        let image = match non_empty(&req.image_url) {
            Some(url) => url.to_string(),
            None => {
                let base = ctx.origin_base().or_else(|| self.config.public_url.clone());
                asset_url(base.as_deref(), &format!("{}.png", animal.unwrap_or("Cat")))
            }
        };

        let metadata = OverrideMetadata {
            name: "SoulPet".to_string(),
            description: format!("{}'s SoulPet: {}", user.unwrap_or("User"), animal.unwrap_or(""))
                .trim()
                .to_string(),
            image,
            external_url: EXTERNAL_URL.to_string(),
            attributes: vec![
                Attribute {
                    trait_type: "Animal".into(),
                    value: animal.unwrap_or("").to_string(),
                },
                Attribute {
                    trait_type: "Owner".into(),
                    value: user.unwrap_or("Unknown").to_string(),
                },
                Attribute {
                    trait_type: "Date".into(),
                    value: today_utc(),
                },
            ],
        };
        let payload = ClaimPayload {
            chain_id: client.chain_id(),
            quantity: 1,
            contract_address: contract_address.clone(),
            recipient_address: recipient.to_string(),
            override_metadata: vec![metadata],
        };

        let upstream = client.claim(&payload)?;
        if !upstream.is_success() {
            return Ok(ApiReply::upstream_failure("Claim failed", upstream));
        }
        Ok(ApiReply::ok(json!({
            "success": true,
            "message": "Claim success",
            "usedContractAddress": contract_address,
            "data": upstream.data,
        })))
    }

    /// GET /api/quiz/questions
    fn quiz_questions(&self) -> ApiReply {
        let animals: Vec<&str> = Animal::ALL.iter().map(|a| a.name()).collect();
        ApiReply::ok(json!({ "success": true, "questions": QUESTIONS, "animals": animals }))
    }

    /// POST /api/quiz/score
    fn quiz_score(&self, body: &[u8]) -> Result<ApiReply> {
        let req: ScoreRequest = parse_body(body)?;
        let answers = req
            .answers
            .iter()
            .map(|a| u8::try_from(*a).map_err(|_| Error::Validation(format!("Answer {} is out of range", a))))
            .collect::<Result<Vec<u8>>>()?;
        let set = AnswerSet::new(answers)?;
        let animal = quiz::score(&set);
        Ok(ApiReply::ok(json!({ "success": true, "animal": animal, "index": animal.index() })))
    }

    /// POST /api/result/image: render the card server-side.
    fn result_image(&self, body: &[u8]) -> Result<ApiReply> {
        let req: ResultImageRequest = parse_body(body)?;
        let user = non_empty(&req.user_name).ok_or_else(|| Error::Validation("userName is required".into()))?;
        let animal: Animal = non_empty(&req.animal)
            .ok_or_else(|| Error::Validation("animal is required".into()))?
            .parse()?;
        let image = self.renderer.render(user, animal, non_empty(&req.date))?;
        Ok(ApiReply::ok(json!({
            "success": true,
            "dataUrl": image.to_data_url(),
            "fileName": ResultImage::file_name(user, animal),
            "digest": image.digest(),
            "width": image.width,
            "height": image.height,
        })))
    }
}

const ROUTES: [(&str, &str); 12] = [
    ("POST", "/api/upload-image"),
    ("POST", "/api/upload-metadata"),
    ("POST", "/api/mint"),
    ("POST", "/api/deploy-drop/deploy-contract"),
    ("POST", "/api/deploy-drop/lazy-mint"),
    ("POST", "/api/deploy-drop/set-conditions"),
    ("POST", "/api/deploy-drop/upload-image"),
    ("POST", "/api/drops/deploy"),
    ("POST", "/api/drops/claim"),
    ("GET", "/api/quiz/questions"),
    ("POST", "/api/quiz/score"),
    ("POST", "/api/result/image"),
];

fn internal_failure_message(route: &str) -> &'static str {
    match route {
        "/api/mint" => "Failed to mint NFT",
        "/api/upload-metadata" => "Failed to process metadata",
        _ => "Unexpected error",
    }
}

fn relay(upstream: Upstream, failure: &str, success: &str) -> ApiReply {
    if !upstream.is_success() {
        return ApiReply::upstream_failure(failure, upstream);
    }
    ApiReply::ok(json!({ "success": true, "message": success, "data": upstream.data }))
}
