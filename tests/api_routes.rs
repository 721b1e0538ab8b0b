mod common;

use common::{assets_dir, config_for, fake_upstream, DEPLOYED, SECRET};
use serde_json::json;
use soulpet::{ApiReply, RequestContext, Router};

const CONTRACT: &str = "0x1111111111111111111111111111111111111111";

fn post(router: &Router, ctx: &RequestContext, path: &str, body: serde_json::Value) -> ApiReply {
    router.handle("POST", path, ctx, body.to_string().as_bytes())
}

#[test]
fn test_claim_requires_contract_then_recipient() {
    let upstream = fake_upstream();
    let router = Router::new(config_for(&upstream, assets_dir("claim-req"))).unwrap();
    let ctx = RequestContext::default();

    let reply = post(&router, &ctx, "/api/drops/claim", json!({ "recipientAddress": "0xabc" }));
    assert_eq!(reply.status, 400);
    assert_eq!(reply.message(), Some("Missing contractAddress (env or body)"));

    let reply = post(&router, &ctx, "/api/drops/claim", json!({ "contractAddress": CONTRACT }));
    assert_eq!(reply.status, 400);
    assert_eq!(reply.message(), Some("recipientAddress is required"));
    assert!(upstream.requests_to("/drops/claim").is_empty());
}

#[test]
fn test_claim_builds_override_metadata() {
    let upstream = fake_upstream();
    let mut cfg = config_for(&upstream, assets_dir("claim-meta"));
    cfg.lootex.contract_address = Some(CONTRACT.into());
    let router = Router::new(cfg).unwrap();
    let ctx = RequestContext {
        origin: Some("http://app.test".into()),
        ..RequestContext::default()
    };

    let reply = post(
        &router,
        &ctx,
        "/api/drops/claim",
        json!({ "recipientAddress": "0xabc", "userName": "Mina", "animalType": "Fox" }),
    );
    assert_eq!(reply.status, 200);
    assert_eq!(reply.message(), Some("Claim success"));
    assert_eq!(reply.body["usedContractAddress"], CONTRACT);
    assert_eq!(reply.body["data"]["txHash"], "0xfeed");

    let seen = upstream.requests_to("/v1/project-wallet/drops/claim");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization.as_deref(), Some(format!("Bearer {}", SECRET).as_str()));
    let body = seen[0].json();
    assert_eq!(body["chainId"], 1868);
    assert_eq!(body["quantity"], 1);
    assert_eq!(body["contractAddress"], CONTRACT);
    assert_eq!(body["recipientAddress"], "0xabc");
    let meta = &body["overrideMetadata"][0];
    assert_eq!(meta["name"], "SoulPet");
    assert_eq!(meta["description"], "Mina's SoulPet: Fox");
    assert_eq!(meta["image"], "http://app.test/assets/animals/Fox.png");
    assert_eq!(meta["externalUrl"], "https://www.lootexplus.com/");
    assert_eq!(meta["attributes"][0], json!({ "trait_type": "Animal", "value": "Fox" }));
    assert_eq!(meta["attributes"][1], json!({ "trait_type": "Owner", "value": "Mina" }));
    assert_eq!(meta["attributes"][2]["trait_type"], "Date");
}

#[test]
fn test_claim_prefers_body_contract_and_image() {
    let upstream = fake_upstream();
    let mut cfg = config_for(&upstream, assets_dir("claim-body"));
    cfg.lootex.contract_address = Some(CONTRACT.into());
    let router = Router::new(cfg).unwrap();

    let reply = post(
        &router,
        &RequestContext::default(),
        "/api/drops/claim",
        json!({ "recipientAddress": "0xabc", "contractAddress": DEPLOYED, "imageUrl": "https://res.test/x.png" }),
    );
    assert_eq!(reply.body["usedContractAddress"], DEPLOYED);
    let body = upstream.requests_to("/drops/claim")[0].json();
    assert_eq!(body["contractAddress"], DEPLOYED);
    let meta = &body["overrideMetadata"][0];
    assert_eq!(meta["image"], "https://res.test/x.png");
    assert_eq!(meta["description"], "User's SoulPet:");
    assert_eq!(meta["attributes"][1]["value"], "Unknown");
}

#[test]
fn test_mint_lazy_mints_then_relays_mint_failure() {
    let upstream = fake_upstream();
    let mut cfg = config_for(&upstream, assets_dir("mint"));
    cfg.lootex.contract_address = Some(CONTRACT.into());
    cfg.lootex.contract_id = Some("contract-7".into());
    let router = Router::new(cfg).unwrap();
    let ctx = RequestContext {
        host: Some("soul.pet".into()),
        forwarded_proto: Some("https".into()),
        ..RequestContext::default()
    };

    let reply = post(&router, &ctx, "/api/mint", json!({ "userName": "Mina" }));
    assert_eq!(reply.status, 400);
    assert_eq!(reply.message(), Some("walletAddress is required"));

    let reply = post(
        &router,
        &ctx,
        "/api/mint",
        json!({ "walletAddress": "0xabc", "userName": "Mina", "animalType": "Owl" }),
    );
    assert_eq!(reply.status, 400);
    assert_eq!(reply.message(), Some("Lootex mint API failed"));
    assert_eq!(reply.body["data"]["error"], "insufficient funds");

    let lazy = upstream.requests_to("/deploy-drop/lazy-mint");
    assert_eq!(lazy.len(), 1);
    let body = lazy[0].json();
    assert_eq!(body["contractId"], "contract-7");
    assert_eq!(body["assetName"], "Mina's Soulpet: Owl");
    assert_eq!(body["assetImageUrl"], "https://soul.pet/assets/animals/Owl.png");
    assert_eq!(body["amount"], 1);

    let mint = upstream.requests_to("/v1/project-wallet/mint");
    assert_eq!(mint[0].json()["recipientAddress"], "0xabc");
    assert_eq!(mint[0].json()["quantity"], 1);
}

#[test]
fn test_mint_requires_configured_contract() {
    let upstream = fake_upstream();
    let router = Router::new(config_for(&upstream, assets_dir("mint-cfg"))).unwrap();
    let reply = post(&router, &RequestContext::default(), "/api/mint", json!({ "walletAddress": "0xabc" }));
    assert_eq!(reply.status, 500);
    assert_eq!(reply.message(), Some("Server misconfigured: missing LOOTEX_CONTRACT_ADDRESS"));
}

#[test]
fn test_drops_deploy_merges_overrides_and_reports_address() {
    let upstream = fake_upstream();
    let router = Router::new(config_for(&upstream, assets_dir("deploy"))).unwrap();
    let reply = post(&router, &RequestContext::default(), "/api/drops/deploy", json!({ "name": "Pets" }));
    assert_eq!(reply.status, 200);
    assert_eq!(reply.message(), Some("Deploy success"));
    assert_eq!(reply.body["usedContractAddress"], DEPLOYED);

    let body = upstream.requests_to("/drops/deploy")[0].json();
    assert_eq!(body["name"], "Pets");
    assert_eq!(body["symbol"], "SP");
    assert_eq!(body["totalSupply"], 10000);

    // An empty body deploys the defaults
    let reply = router.handle("POST", "/api/drops/deploy", &RequestContext::default(), b"");
    assert_eq!(reply.status, 200);
    assert_eq!(upstream.requests_to("/drops/deploy")[1].json()["name"], "SoulPet");
}

#[test]
fn test_deploy_drop_routes_validate_and_coerce() {
    let upstream = fake_upstream();
    let router = Router::new(config_for(&upstream, assets_dir("deploy-drop"))).unwrap();
    let ctx = RequestContext::default();

    let reply = post(&router, &ctx, "/api/deploy-drop/deploy-contract", json!({ "name": "Pets" }));
    assert_eq!(reply.message(), Some("imageUrl, name, symbol are required"));

    let reply = post(
        &router,
        &ctx,
        "/api/deploy-drop/deploy-contract",
        json!({ "imageUrl": "https://img", "name": "Pets", "symbol": "SP", "chainId": "1946" }),
    );
    assert_eq!(reply.message(), Some("Contract deployed"));
    let body = upstream.requests_to("/deploy-drop/deploy-contract")[0].json();
    assert_eq!(body["chainId"], 1946);
    assert_eq!(body["isCreatorFee"], false);

    let reply = post(&router, &ctx, "/api/deploy-drop/lazy-mint", json!({ "contractId": "c" }));
    assert_eq!(reply.message(), Some("contractId, assetName, assetImageUrl are required"));
    let reply = post(
        &router,
        &ctx,
        "/api/deploy-drop/lazy-mint",
        json!({ "contractId": "c", "assetName": "Fox", "assetImageUrl": "https://img/fox.png" }),
    );
    assert_eq!(reply.status, 200);
    assert_eq!(reply.message(), Some("Lazy mint created"));
    assert_eq!(reply.body["data"]["id"], "asset-1");
    assert_eq!(upstream.requests_to("/deploy-drop/lazy-mint")[0].json()["amount"], 1);

    let reply = post(
        &router,
        &ctx,
        "/api/deploy-drop/set-conditions",
        json!({ "contractId": "c", "price": 0.01, "amount": "5", "limitPerWallet": 2 }),
    );
    assert_eq!(reply.message(), Some("Conditions updated"));
    assert_eq!(reply.body["data"], json!({}));
    let body = upstream.requests_to("/deploy-drop/set-conditions")[0].json();
    assert_eq!(body["price"], "0.01");
    assert_eq!(body["amount"], 5);
    assert_eq!(body["limitPerWallet"], 2);
    assert!(body.get("startTime").is_none());
}

#[test]
fn test_deploy_drop_upload_sends_multipart_artwork() {
    let upstream = fake_upstream();
    let assets = assets_dir("upload");
    let router = Router::new(config_for(&upstream, assets.clone())).unwrap();
    let ctx = RequestContext::default();

    let reply = post(&router, &ctx, "/api/deploy-drop/upload-image", json!({ "animal": "Panda" }));
    assert_eq!(reply.status, 200);
    assert_eq!(reply.message(), Some("Image uploaded"));
    assert_eq!(reply.body["data"]["imageUrl"], "https://cdn.test/asset.png");

    let seen = &upstream.requests_to("/deploy-drop/upload-image")[0];
    assert!(seen.content_type.as_deref().unwrap().starts_with("multipart/form-data"));
    assert!(seen.body.contains("name=\"imageFile\"; filename=\"Panda.png\""));
    assert!(seen.body.contains("Soulpet Panda"));

    let reply = post(&router, &ctx, "/api/deploy-drop/upload-image", json!({ "animal": "../../etc/passwd" }));
    assert_eq!(reply.status, 400);

    let reply = post(
        &router,
        &ctx,
        "/api/deploy-drop/upload-image",
        json!({ "filePathOverride": assets.join("Cat.png") }),
    );
    assert_eq!(reply.status, 400);
    assert_eq!(reply.message(), Some("filePathOverride must stay inside the project"));
}

#[test]
fn test_upload_image_relays_cloudinary_result() {
    let upstream = fake_upstream();
    let router = Router::new(config_for(&upstream, assets_dir("cloudinary"))).unwrap();
    let reply = post(
        &router,
        &RequestContext::default(),
        "/api/upload-image",
        json!({ "imageBase64": "data:image/png;base64,iVBORw0KGgo=" }),
    );
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["imageUrl"], "https://res.test/soulpet/card.png");
    assert_eq!(reply.body["publicId"], "soulpet/soulpet_1");

    let seen = &upstream.requests_to("/v1_1/demo/image/upload")[0];
    assert!(seen.body.contains("folder=soulpet"));
    assert!(seen.body.contains("signature_algorithm=sha256"));
    assert!(seen.body.contains("api_key=key"));
}

#[test]
fn test_result_image_renders_card() {
    let upstream = fake_upstream();
    let router = Router::new(config_for(&upstream, assets_dir("result"))).unwrap();
    let reply = post(
        &router,
        &RequestContext::default(),
        "/api/result/image",
        json!({ "userName": "Mina", "animal": "owl", "date": "2026-10-18" }),
    );
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["fileName"], "Soulpet-Mina-Owl.png");
    assert_eq!(reply.body["width"], 900);
    assert!(reply.body["dataUrl"].as_str().unwrap().starts_with("data:image/png;base64,"));
    assert_eq!(reply.body["digest"].as_str().unwrap().len(), 64);
}
