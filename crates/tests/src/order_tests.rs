use crate::fixtures::test_app::TestApp;
use futures::future::join_all;
use serde_json::{Value, json};

#[tokio::test]
async fn partial_acceptance_decrements_listing() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "shankar").await;
    let factory = app.register_user("factory", "jawahar").await;
    let listing = app.create_listing(&farmer, 50.0, 3000.0).await;
    let listing_id = listing["id"].as_str().unwrap();

    let order = app.place_order(&factory, listing_id, 20.0).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_price"], 60000.0);
    assert_eq!(order["farmer_id"], farmer.id);

    let resp = app
        .auth_post(
            &format!("/api/orders/{}/accept", order["id"].as_str().unwrap()),
            &farmer.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "accepted");
    assert!(json["responded_at"].is_string());

    let resp = app
        .auth_get(&format!("/api/listings/{listing_id}"), &farmer.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["quantity_tons"], 30.0);
}

#[tokio::test]
async fn full_acceptance_removes_listing() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "baban").await;
    let factory = app.register_user("factory", "krishna").await;
    let listing = app.create_listing(&farmer, 25.0, 3000.0).await;
    let listing_id = listing["id"].as_str().unwrap();

    let order = app.place_order(&factory, listing_id, 25.0).await;
    let resp = app
        .auth_post(
            &format!("/api/orders/{}/accept", order["id"].as_str().unwrap()),
            &farmer.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get(&format!("/api/listings/{listing_id}"), &farmer.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn order_larger_than_listing_is_rejected() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "sopan").await;
    let factory = app.register_user("factory", "bhima").await;
    let listing = app.create_listing(&farmer, 10.0, 3000.0).await;

    let resp = app
        .auth_post("/api/orders", &factory.access_token)
        .json(&json!({ "listing_id": listing["id"], "quantity_tons": 10.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app
        .auth_post("/api/orders", &farmer.access_token)
        .json(&json!({ "listing_id": listing["id"], "quantity_tons": 1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn second_order_fails_once_listing_is_sold_out() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "tukaram").await;
    let f1 = app.register_user("factory", "factory_one").await;
    let f2 = app.register_user("factory", "factory_two").await;
    let listing = app.create_listing(&farmer, 10.0, 3000.0).await;
    let listing_id = listing["id"].as_str().unwrap();

    let first = app.place_order(&f1, listing_id, 10.0).await;
    let second = app.place_order(&f2, listing_id, 10.0).await;

    let resp = app
        .auth_post(
            &format!("/api/orders/{}/accept", first["id"].as_str().unwrap()),
            &farmer.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let second_id = second["id"].as_str().unwrap();
    let resp = app
        .auth_post(&format!("/api/orders/{second_id}/accept"), &farmer.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "not_found");

    // The failed acceptance leaves the order pending.
    let resp = app
        .auth_get(&format!("/api/orders/{second_id}"), &f2.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn concurrent_acceptance_never_oversells() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "eknath").await;
    let factory = app.register_user("factory", "panchganga").await;
    let listing = app.create_listing(&farmer, 30.0, 3000.0).await;
    let listing_id = listing["id"].as_str().unwrap();

    let mut order_ids = Vec::new();
    for _ in 0..4 {
        let order = app.place_order(&factory, listing_id, 10.0).await;
        order_ids.push(order["id"].as_str().unwrap().to_string());
    }

    let requests = order_ids.iter().map(|id| {
        app.auth_post(&format!("/api/orders/{id}/accept"), &farmer.access_token)
            .send()
    });
    let results = join_all(requests).await;
    let accepted = results
        .iter()
        .filter(|r| r.as_ref().map(|r| r.status().as_u16() == 200).unwrap_or(false))
        .count();
    assert_eq!(accepted, 3);

    let resp = app
        .auth_get(&format!("/api/listings/{listing_id}"), &farmer.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn reject_and_cancel_are_role_gated() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "vitthal").await;
    let factory = app.register_user("factory", "malegaon").await;
    let listing = app.create_listing(&farmer, 40.0, 3000.0).await;
    let listing_id = listing["id"].as_str().unwrap();

    let o1 = app.place_order(&factory, listing_id, 5.0).await;
    let o1 = o1["id"].as_str().unwrap();
    let o2 = app.place_order(&factory, listing_id, 5.0).await;
    let o2 = o2["id"].as_str().unwrap();

    // Factory cannot reject, farmer cannot cancel.
    let resp = app
        .auth_post(&format!("/api/orders/{o1}/reject"), &factory.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let resp = app
        .auth_post(&format!("/api/orders/{o2}/cancel"), &farmer.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post(&format!("/api/orders/{o1}/reject"), &farmer.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "rejected");

    let resp = app
        .auth_post(&format!("/api/orders/{o2}/cancel"), &factory.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "cancelled");

    // Terminal orders cannot be accepted.
    let resp = app
        .auth_post(&format!("/api/orders/{o1}/accept"), &farmer.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    // Rejection does not touch the listing.
    let resp = app
        .auth_get(&format!("/api/listings/{listing_id}"), &farmer.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["quantity_tons"], 40.0);
}

#[tokio::test]
async fn parties_list_their_orders() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "namdev").await;
    let factory = app.register_user("factory", "ajinkyatara").await;
    let outsider = app.register_user("factory", "outsider").await;
    let listing = app.create_listing(&farmer, 40.0, 3000.0).await;
    let order = app
        .place_order(&factory, listing["id"].as_str().unwrap(), 5.0)
        .await;

    for (path, token) in [
        ("/api/farmer/orders", &farmer.access_token),
        ("/api/factory/orders?status=pending", &factory.access_token),
    ] {
        let resp = app.auth_get(path, token).send().await.unwrap();
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["total"], 1, "{path}");
        assert_eq!(json["items"][0]["id"], order["id"]);
    }

    let resp = app
        .auth_get("/api/factory/orders?status=accepted", &factory.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 0);

    let resp = app
        .auth_get(
            &format!("/api/orders/{}", order["id"].as_str().unwrap()),
            &outsider.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}
