//! End-to-end tests of the vente HTTP API over in-memory storage.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use vente_engine::api::{self, AppState};
use vente_engine::config::{PricingSettings, StockPolicies};
use vente_engine::domain::aggregates::{CatalogItem, PromoCode};
use vente_engine::domain::value_objects::{Money, Rate};
use vente_engine::infrastructure::memory::{InMemoryCatalog, InMemoryVenteRepository};
use vente_engine::infrastructure::{EventPublisher, StaticSettings};
use vente_engine::VenteService;

// =============================================================================
// Fixtures
// =============================================================================

fn dec(v: i64) -> Decimal { Decimal::new(v, 0) }

fn server_with(pricing: PricingSettings) -> TestServer {
    let catalog = InMemoryCatalog::new();
    catalog.insert(CatalogItem::product("P1", "Whey 2kg", Money::new(dec(100))).with_stock(5).with_old_price(Money::new(dec(120)))).unwrap();
    catalog.insert(CatalogItem::product("P200", "Gift box", Money::new(dec(200)))).unwrap();
    catalog.insert(CatalogItem::pack("K1", "Mass pack", Money::new(dec(250)))).unwrap();
    catalog.insert(CatalogItem::product("OFF", "Discontinued", Money::new(dec(10))).disabled()).unwrap();

    let repo = InMemoryVenteRepository::new();
    let now = Utc::now();
    let ten = Rate::discount(Decimal::new(10, 2)).unwrap();
    repo.insert_promo_code(PromoCode::new("TEN", ten, now - Duration::days(1), now + Duration::days(30)).unwrap()).unwrap();
    repo.insert_promo_code(PromoCode::new("OLD", ten, now - Duration::days(30), now - Duration::days(1)).unwrap()).unwrap();
    repo.insert_promo_code(PromoCode::new("SOON", ten, now + Duration::days(1), now + Duration::days(30)).unwrap()).unwrap();
    repo.insert_promo_code(PromoCode::new("OFF", ten, now - Duration::days(1), now + Duration::days(30)).unwrap().deactivated()).unwrap();
    repo.insert_promo_code(PromoCode::new("ONCE", ten, now - Duration::days(1), now + Duration::days(30)).unwrap().with_usage_limit(1)).unwrap();

    let service = VenteService::new(
        Arc::new(repo),
        Arc::new(catalog),
        Arc::new(StaticSettings(pricing)),
        EventPublisher::default(),
        StockPolicies::default(),
    );
    TestServer::new(api::router(AppState { service })).unwrap()
}

fn server() -> TestServer { server_with(PricingSettings::default()) }

fn order(item: &str, quantity: u32) -> Value {
    json!({
        "items": [{ "type": "Product", "itemId": item, "quantity": quantity }],
        "isNewClient": true,
        "client": {
            "name": "Amel Ben Salah", "email": "amel@example.com", "phone1": "22000000",
            "address": "12 rue de Marseille", "ville": "Tunis"
        },
        "modePayment": "CASH"
    })
}

fn with(mut body: Value, key: &str, value: Value) -> Value {
    body[key] = value;
    body
}

fn money(v: &Value) -> Decimal {
    match v {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

async fn create(server: &TestServer, body: Value) -> Value {
    let response = server.post("/vente/new").json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

// =============================================================================
// Pricing
// =============================================================================

#[tokio::test]
async fn test_below_threshold_pays_shipping() {
    let server = server();
    let vente = create(&server, order("P1", 2)).await;
    assert_eq!(money(&vente["totalHT"]), dec(200));
    assert_eq!(money(&vente["totalTTC"]), dec(238));
    assert_eq!(money(&vente["livraison"]), dec(7));
    assert_eq!(money(&vente["netAPayer"]), dec(245));
    assert_eq!(vente["status"], "pending");
    assert!(vente["reference"].as_str().unwrap().starts_with("VNT-"));
}

#[tokio::test]
async fn test_above_threshold_ships_free() {
    let server = server();
    let vente = create(&server, order("P1", 3)).await;
    assert_eq!(money(&vente["totalTTC"]), dec(357));
    assert_eq!(money(&vente["livraison"]), Decimal::ZERO);
    assert_eq!(money(&vente["netAPayer"]), dec(357));
}

#[tokio::test]
async fn test_threshold_is_inclusive() {
    let server = server_with(PricingSettings::validated(Decimal::ZERO, dec(7), dec(200)).unwrap());
    let vente = create(&server, order("P200", 1)).await;
    assert_eq!(money(&vente["livraison"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_promo_discount_on_ttc_subtotal() {
    let server = server_with(PricingSettings::validated(Decimal::ZERO, dec(7), dec(300)).unwrap());
    let vente = create(&server, with(order("P200", 1), "promoCode", json!("TEN"))).await;
    assert_eq!(money(&vente["discount"]), dec(20));
    assert_eq!(money(&vente["netAPayer"]), dec(187));
    assert_eq!(vente["promoCode"], "TEN");
}

#[tokio::test]
async fn test_products_discount_is_informational() {
    let server = server();
    let vente = create(&server, order("P1", 1)).await;
    // (120 - 100) * 1 * 1.19
    assert_eq!(money(&vente["productsDiscount"]), Decimal::new(238, 1));
    assert_eq!(money(&vente["netAPayer"]), Decimal::new(126, 0));
}

#[tokio::test]
async fn test_net_is_clamped_at_zero() {
    let server = server();
    let body = with(with(order("P1", 1), "additionalDiscount", json!(1000)), "channel", json!("admin"));
    let vente = create(&server, body).await;
    assert_eq!(money(&vente["netAPayer"]), Decimal::ZERO);
}

fn violation_fields(body: &Value) -> Vec<&str> {
    body["details"]["fields"].as_array().unwrap().iter().map(|f| f["field"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn test_amounts_beyond_storage_are_rejected() {
    let server = server();
    let response = server.post("/vente/quote").json(&with(order("P1", 1), "additionalCharges", json!("79228162514264337593543950335"))).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(violation_fields(&body), vec!["additionalCharges"]);

    // largest accepted charge, pushed over the limit by the order itself
    let response = server.post("/vente/new").json(&with(order("P1", 1), "additionalCharges", json!("99999999999.999"))).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(violation_fields(&body), vec!["netAPayer"]);

    let body = with(with(order("P1", 1), "additionalDiscount", json!("99999999999.999")), "channel", json!("admin"));
    let vente = create(&server, body).await;
    assert_eq!(money(&vente["netAPayer"]), Decimal::ZERO);
    let list: Value = server.get("/vente").await.json();
    assert_eq!(list["total"], 1);
}

#[tokio::test]
async fn test_catalog_price_wins_over_client_price() {
    let server = server();
    let mut body = order("P1", 2);
    body["items"][0]["price"] = json!(1);
    body["livraison"] = json!(0);
    let vente = create(&server, body).await;
    assert_eq!(money(&vente["items"][0]["price"]), dec(100));
    assert_eq!(money(&vente["netAPayer"]), dec(245));
}

#[tokio::test]
async fn test_quote_persists_nothing() {
    let server = server();
    let response = server.post("/vente/quote").json(&with(order("P1", 2), "promoCode", json!("ONCE"))).await;
    response.assert_status_ok();
    let quote: Value = response.json();
    assert_eq!(quote["promoCode"], "ONCE");
    let list: Value = server.get("/vente").await.json();
    assert_eq!(list["total"], 0);
    // the single-use code is still available
    create(&server, with(order("P1", 2), "promoCode", json!("ONCE"))).await;
}

// =============================================================================
// Promo codes
// =============================================================================

#[tokio::test]
async fn test_promo_errors_have_distinct_codes() {
    let server = server();
    for (code, expected) in [
        ("NOPE", "PROMO_CODE_NOT_FOUND"),
        ("OFF", "PROMO_CODE_INACTIVE"),
        ("OLD", "PROMO_CODE_EXPIRED"),
        ("SOON", "PROMO_CODE_EXPIRED"),
    ] {
        let response = server.post("/vente/new").json(&with(order("P1", 1), "promoCode", json!(code))).await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["code"], expected, "code {}", code);
    }
    let list: Value = server.get("/vente").await.json();
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn test_expired_code_then_retry_without_it() {
    let server = server();
    let response = server.post("/vente/new").json(&with(order("P1", 2), "promoCode", json!("OLD"))).await;
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("expired on"));
    let vente = create(&server, order("P1", 2)).await;
    assert_eq!(vente["promoCode"], Value::Null);
}

#[tokio::test]
async fn test_usage_limit_enforced() {
    let server = server();
    create(&server, with(order("P1", 1), "promoCode", json!("ONCE"))).await;
    let response = server.post("/vente/new").json(&with(order("P1", 1), "promoCode", json!("ONCE"))).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "PROMO_CODE_EXHAUSTED");

    let promo: Value = server.get("/promo-code/ONCE").await.json();
    assert_eq!(promo["usageCount"], 1);
    assert_eq!(money(&promo["discountPercent"]), dec(10));
}

#[tokio::test]
async fn test_unknown_promo_lookup_is_422() {
    server().get("/promo-code/NOPE").await.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Validation and availability
// =============================================================================

#[tokio::test]
async fn test_validation_lists_fields() {
    let server = server();
    let mut body = order("P1", 0);
    body["client"]["email"] = json!("not-an-email");
    let response = server.post("/vente/new").json(&body).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(violation_fields(&body), vec!["items[0].quantity"]);
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let server = server();
    let response = server.post("/vente/new").json(&json!({ "items": "nope" })).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unavailable_items() {
    let server = server();
    for (item, reason) in [("OFF", "disabled"), ("GHOST", "missing")] {
        let response = server.post("/vente/new").json(&order(item, 1)).await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["code"], "ITEM_UNAVAILABLE");
        assert_eq!(body["details"]["itemId"], item);
        assert_eq!(body["details"]["unavailable"]["reason"], reason);
    }
}

#[tokio::test]
async fn test_stock_enforced_on_storefront_only() {
    let server = server();
    server.post("/vente/new").json(&order("P1", 6)).await.assert_status(StatusCode::CONFLICT);
    create(&server, with(order("P1", 6), "channel", json!("admin"))).await;
}

#[tokio::test]
async fn test_stock_counts_every_variant() {
    let server = server();
    let mut body = order("P1", 5);
    body["items"] = json!([
        { "type": "Product", "itemId": "P1", "quantity": 5, "variant": "Chocolate" },
        { "type": "Product", "itemId": "P1", "quantity": 5, "variant": "Vanilla" }
    ]);
    let response = server.post("/vente/new").json(&body).await;
    response.assert_status(StatusCode::CONFLICT);
    let error: Value = response.json();
    assert_eq!(error["details"]["unavailable"]["reason"], "outOfStock");
    assert_eq!(error["details"]["unavailable"]["requested"], 10);
    assert_eq!(error["details"]["unavailable"]["available"], 5);

    let vente = create(&server, with(body, "channel", json!("admin"))).await;
    assert_eq!(vente["items"].as_array().unwrap().len(), 2);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_cancelled_vente_cannot_reopen() {
    let server = server();
    let vente = create(&server, order("P1", 1)).await;
    let id = vente["id"].as_str().unwrap();
    let actor = (HeaderName::from_static("x-actor"), HeaderValue::from_static("amine"));

    let response = server.put(&format!("/vente/update/{}", id)).add_header(actor.0.clone(), actor.1.clone()).json(&json!({ "status": "cancelled" })).await;
    response.assert_status_ok();

    let response = server.put(&format!("/vente/update/{}", id)).add_header(actor.0, actor.1).json(&json!({ "status": "processing" })).await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let stored: Value = server.get(&format!("/vente/{}", id)).await.json();
    assert_eq!(stored["status"], "cancelled");

    let history: Value = server.get(&format!("/vente/{}/history", id)).await.json();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["to"], "pending");
    assert_eq!(history[1]["from"], "pending");
    assert_eq!(history[1]["to"], "cancelled");
    assert_eq!(history[1]["actor"], "amine");
}

#[tokio::test]
async fn test_update_keeps_frozen_totals() {
    let server = server();
    let vente = create(&server, order("P1", 2)).await;
    let id = vente["id"].as_str().unwrap();
    let mut resend = vente.clone();
    resend["status"] = json!("delivered");
    resend["note"] = json!("left with the neighbour");
    resend["netAPayer"] = json!("1.000");

    let response = server.put(&format!("/vente/update/{}", id)).json(&resend).await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["status"], "delivered");
    assert_eq!(updated["note"], "left with the neighbour");
    assert_eq!(money(&updated["netAPayer"]), dec(245));
    assert_eq!(updated["reference"], vente["reference"]);

    let history: Value = server.get(&format!("/vente/{}/history", id)).await.json();
    assert_eq!(history[1]["actor"], "system");
}

#[tokio::test]
async fn test_same_status_adds_no_history() {
    let server = server();
    let vente = create(&server, order("P1", 1)).await;
    let id = vente["id"].as_str().unwrap();
    server.put(&format!("/vente/update/{}", id)).json(&json!({ "status": "pending" })).await.assert_status_ok();
    let history: Value = server.get(&format!("/vente/{}/history", id)).await.json();
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_then_not_found() {
    let server = server();
    let vente = create(&server, order("P1", 1)).await;
    let id = vente["id"].as_str().unwrap();
    server.delete(&format!("/vente/{}", id)).await.assert_status(StatusCode::NO_CONTENT);
    let response = server.get(&format!("/vente/{}", id)).await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["code"], "VENTE_NOT_FOUND");
    server.delete(&format!("/vente/{}", id)).await.assert_status_not_found();
}

#[tokio::test]
async fn test_list_newest_first() {
    let server = server();
    let first = create(&server, order("P1", 1)).await;
    let second = create(&server, order("P1", 2)).await;
    let list: Value = server.get("/vente?page=1&perPage=1").await.json();
    assert_eq!(list["total"], 2);
    assert_eq!(list["data"][0]["id"], second["id"]);
    let list: Value = server.get("/vente?page=2&perPage=1").await.json();
    assert_eq!(list["data"][0]["id"], first["id"]);
}

#[tokio::test]
async fn test_health() {
    let response = server().get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}
