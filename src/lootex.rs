//! Blocking client for the Lootex project-wallet API.
//!
//! Every call is a single authenticated POST under
//! `{api_base}/v1/project-wallet/`. Responses are relayed as-is: the caller
//! gets the upstream status plus the JSON body (or `{}` when the body is not
//! JSON) and decides how to present failures.

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, error};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::{Error, LootexConfig, Result};

/// Raw upstream answer
#[derive(Debug, Clone, PartialEq)]
pub struct Upstream {
    pub status: u16,
    pub data: Value,
}

impl Upstream {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintPayload {
    pub chain_id: u64,
    pub contract_address: String,
    pub recipient_address: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LazyMintPayload {
    pub chain_id: u64,
    pub contract_id: String,
    pub asset_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_description: Option<String>,
    pub asset_image_url: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployContractPayload {
    pub chain_id: u64,
    pub image_url: String,
    pub name: String,
    pub symbol: String,
    pub is_creator_fee: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_fee_address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetConditionsPayload {
    pub chain_id: u64,
    pub contract_id: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_address: Option<String>,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_per_wallet: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub external_url: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPayload {
    pub chain_id: u64,
    pub quantity: u64,
    pub contract_address: String,
    pub recipient_address: String,
    pub override_metadata: Vec<OverrideMetadata>,
}

/// Defaults for a claim-based drop; callers may override any top-level key.
pub fn default_drop_payload(chain_id: u64) -> Value {
    json!({
        "chainId": chain_id,
        "mode": "standard",
        "symbol": "SP",
        "totalSupply": 10000,
        "unitPrice": 0,
        "limitPerWallet": 0,
        "creatorFeeBps": 0,
        "metadataStorageType": "metadata-api",
        "name": "SoulPet",
        "defaultTokenMetadata": { "name": "SoulPet" },
    })
}

/// Shallow merge: top-level keys of `overrides` replace those in `base`.
pub fn merge_overrides(mut base: Value, overrides: &Value) -> Value {
    if let (Some(target), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            target.insert(k.clone(), v.clone());
        }
    }
    base
}

/// `0x` followed by exactly 40 hex digits
pub fn is_evm_address(s: &str) -> bool {
    s.len() == 42 && s.starts_with("0x") && s[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// Breadth-first search for the first contract address in a deploy response.
pub fn extract_contract_address(input: &Value) -> Option<String> {
    const KEYS: [&str; 4] = ["contractAddress", "contract_address", "address", "contract"];
    let mut queue: VecDeque<&Value> = VecDeque::new();
    queue.push_back(input);

    while let Some(node) = queue.pop_front() {
        match node {
            Value::Object(obj) => {
                for (k, v) in obj {
                    if let Value::String(s) = v {
                        if KEYS.contains(&k.as_str()) && is_evm_address(s) {
                            return Some(s.clone());
                        }
                    }
                    if v.is_object() || v.is_array() {
                        queue.push_back(v);
                    }
                }
            }
            Value::Array(items) => {
                queue.extend(items.iter().filter(|v| v.is_object() || v.is_array()));
            }
            _ => {}
        }
    }
    None
}

/// Authenticated Lootex project-wallet client
#[derive(Clone)]
pub struct LootexClient {
    http: Client,
    api_base: String,
    secret_key: String,
    chain_id: u64,
}

impl std::fmt::Debug for LootexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LootexClient")
            .field("api_base", &self.api_base)
            .field("secret_key", &"<redacted>")
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl LootexClient {
    pub fn new(config: &LootexConfig, timeout: Duration) -> Result<Self> {
        let secret_key = config
            .secret_key
            .clone()
            .ok_or(Error::Misconfigured("LOOTEX_SECRET_KEY"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key,
            chain_id: config.chain_id,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/project-wallet/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn read(path: &str, resp: Response) -> Result<Upstream> {
        let status = resp.status().as_u16();
        let text = resp.text()?;
        let data = serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Map::new()));
        let upstream = Upstream { status, data };
        if upstream.is_success() {
            debug!("lootex {} -> {}", path, status);
        } else {
            error!("lootex {} error: {} {}", path, status, upstream.data);
        }
        Ok(upstream)
    }

    /// POST a JSON payload to `v1/project-wallet/{path}`.
    pub fn post_json<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<Upstream> {
        let resp = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.secret_key)
            .json(payload)
            .send()?;
        Self::read(path, resp)
    }

    /// POST a multipart form to `v1/project-wallet/{path}`.
    pub fn post_multipart(&self, path: &str, form: Form) -> Result<Upstream> {
        let resp = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.secret_key)
            .multipart(form)
            .send()?;
        Self::read(path, resp)
    }

    /// Server-wallet mint of `quantity` tokens to a recipient
    pub fn mint(&self, payload: &MintPayload) -> Result<Upstream> {
        self.post_json("mint", payload)
    }

    pub fn lazy_mint(&self, payload: &LazyMintPayload) -> Result<Upstream> {
        self.post_json("deploy-drop/lazy-mint", payload)
    }

    pub fn deploy_contract(&self, payload: &DeployContractPayload) -> Result<Upstream> {
        self.post_json("deploy-drop/deploy-contract", payload)
    }

    pub fn set_conditions(&self, payload: &SetConditionsPayload) -> Result<Upstream> {
        self.post_json("deploy-drop/set-conditions", payload)
    }

    /// Upload PNG artwork for a deploy-drop asset
    pub fn upload_image(&self, file_name: &str, png: Vec<u8>, asset_name: &str) -> Result<Upstream> {
        let part = Part::bytes(png).file_name(file_name.to_string()).mime_str("image/png")?;
        let form = Form::new().part("imageFile", part).text("assetName", asset_name.to_string());
        self.post_multipart("deploy-drop/upload-image", form)
    }

    /// Deploy a claim-based drop; `payload` is usually built with [`default_drop_payload`]
    pub fn deploy_drop(&self, payload: &Value) -> Result<Upstream> {
        self.post_json("drops/deploy", payload)
    }

    pub fn claim(&self, payload: &ClaimPayload) -> Result<Upstream> {
        self.post_json("drops/claim", payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x1234567890abcdefABCDEF1234567890abcdef12";

    #[test]
    fn address_shape() {
        assert!(is_evm_address(ADDR));
        assert!(!is_evm_address("0x1234"));
        assert!(!is_evm_address("1x1234567890abcdefABCDEF1234567890abcdef12"));
        assert!(!is_evm_address("0x1234567890abcdefABCDEF1234567890abcdeg12"));
    }

    #[test]
    fn extracts_nested_address() {
        let data = json!({ "data": { "contract": { "address": ADDR } } });
        assert_eq!(extract_contract_address(&data).as_deref(), Some(ADDR));

        let data = json!({ "items": [ { "contract_address": ADDR } ] });
        assert_eq!(extract_contract_address(&data).as_deref(), Some(ADDR));
    }

    #[test]
    fn extraction_ignores_wrong_keys_and_shapes() {
        let data = json!({ "txHash": ADDR, "address": "0xnothex", "contract": { "id": 7 } });
        assert_eq!(extract_contract_address(&data), None);
        assert_eq!(extract_contract_address(&json!("plain")), None);
    }

    #[test]
    fn extraction_prefers_shallower_match() {
        let deep = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let data = json!({ "nested": { "address": deep }, "contractAddress": ADDR });
        assert_eq!(extract_contract_address(&data).as_deref(), Some(ADDR));
    }

    #[test]
    fn extraction_follows_response_key_order() {
        let first = "0x1111111111111111111111111111111111111111";
        let second = "0x2222222222222222222222222222222222222222";
        let data: Value = serde_json::from_str(&format!(
            r#"{{"contractAddress":"{}","address":"{}"}}"#,
            first, second
        ))
        .unwrap();
        assert_eq!(extract_contract_address(&data).as_deref(), Some(first));

        let data: Value = serde_json::from_str(&format!(
            r#"{{"address":"{}","contractAddress":"{}"}}"#,
            second, first
        ))
        .unwrap();
        assert_eq!(extract_contract_address(&data).as_deref(), Some(second));
    }

    #[test]
    fn overrides_replace_top_level_keys() {
        let merged = merge_overrides(default_drop_payload(1868), &json!({ "name": "Other", "totalSupply": 5 }));
        assert_eq!(merged["name"], "Other");
        assert_eq!(merged["totalSupply"], 5);
        assert_eq!(merged["symbol"], "SP");
        assert_eq!(merged["defaultTokenMetadata"]["name"], "SoulPet");

        let untouched = merge_overrides(default_drop_payload(1), &json!([1, 2]));
        assert_eq!(untouched["chainId"], 1);
    }

    #[test]
    fn payloads_use_camel_case_and_skip_unset() {
        let p = LazyMintPayload {
            chain_id: 1868,
            contract_id: "c1".into(),
            asset_name: "Mina's Soulpet: Owl".into(),
            asset_description: None,
            asset_image_url: "http://x/Owl.png".into(),
            amount: 1,
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["contractId"], "c1");
        assert_eq!(v["assetImageUrl"], "http://x/Owl.png");
        assert!(v.get("assetDescription").is_none());

        let a = serde_json::to_value(Attribute { trait_type: "Animal".into(), value: "Owl".into() }).unwrap();
        assert_eq!(a, json!({ "trait_type": "Animal", "value": "Owl" }));
    }

    #[test]
    fn client_requires_secret() {
        let err = LootexClient::new(&LootexConfig::default(), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::Misconfigured("LOOTEX_SECRET_KEY")));
    }

    #[test]
    fn debug_output_hides_secret() {
        let cfg = LootexConfig {
            secret_key: Some("sk_live_hush".into()),
            ..LootexConfig::default()
        };
        let client = LootexClient::new(&cfg, Duration::from_secs(1)).unwrap();
        let shown = format!("{:?}", client);
        assert!(shown.contains("api.lootexplus.com"));
        assert!(!shown.contains("sk_live_hush"));
    }
}
