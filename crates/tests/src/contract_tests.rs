use crate::fixtures::test_app::TestApp;
use serde_json::{Value, json};

#[tokio::test]
async fn contract_lifecycle() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "hutatma").await;
    let farmer = app.register_user("farmer", "laxman").await;
    let hhm = app.register_user("hhm", "kondiba").await;

    let resp = app
        .auth_post("/api/contracts", &factory.access_token)
        .json(&json!({
            "farmer_id": farmer.id,
            "hhm_id": hhm.id,
            "quantity_tons": 100.0,
            "price_per_ton": 3150.0,
            "start_date": "2025-11-01",
            "end_date": "2026-03-31T00:00:00Z",
            "terms": "Weekly payment against weighbridge slips",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let contract: Value = resp.json().await.unwrap();
    assert_eq!(contract["status"], "pending");
    assert_eq!(contract["crop_type"], "sugarcane");
    assert_eq!(contract["total_value"], 315000.0);
    let path = format!("/api/contracts/{}", contract["id"].as_str().unwrap());

    // Every party sees it, in their own list too.
    for user in [&factory, &farmer, &hhm] {
        let resp = app.auth_get(&path, &user.access_token).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200, "{}", user.username);
        let resp = app.auth_get("/api/contracts", &user.access_token).send().await.unwrap();
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["total"], 1, "{}", user.username);
    }

    // Factory cannot complete a contract that was never accepted.
    let resp = app
        .auth_post(&format!("{path}/complete"), &factory.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app
        .auth_post(&format!("{path}/accept"), &farmer.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "active");
    assert!(json["responded_at"].is_string());

    let resp = app
        .auth_post(&format!("{path}/complete"), &factory.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "completed");

    let resp = app
        .auth_get("/api/contracts?status=completed", &farmer.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 1);
}

#[tokio::test]
async fn contract_rules() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "chhatrapati").await;
    let other_factory = app.register_user("factory", "nira").await;
    let farmer = app.register_user("farmer", "ramchandra").await;
    let worker = app.register_user("labour", "tanaji").await;

    let create = |farmer_id: &str, start: &str, end: &str| {
        app.auth_post("/api/contracts", &factory.access_token)
            .json(&json!({
                "farmer_id": farmer_id,
                "quantity_tons": 10.0,
                "price_per_ton": 3000.0,
                "start_date": start,
                "end_date": end,
            }))
            .send()
    };

    // Farmer must be a farmer, and the window must be ordered.
    let resp = create(&worker.id, "2025-11-01", "2025-12-01").await.unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let resp = create(&farmer.id, "2025-12-01", "2025-11-01").await.unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let resp = create(&farmer.id, "2025-11-01", "2025-12-01").await.unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let contract: Value = resp.json().await.unwrap();
    let path = format!("/api/contracts/{}", contract["id"].as_str().unwrap());

    // Outsiders cannot see or cancel it.
    let resp = app.auth_get(&path, &other_factory.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let resp = app
        .auth_post(&format!("{path}/cancel"), &other_factory.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // Workers are not party to contracts.
    let resp = app.auth_get("/api/contracts", &worker.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post(&format!("{path}/reject"), &farmer.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "rejected");

    let resp = app
        .auth_post(&format!("{path}/cancel"), &factory.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}
