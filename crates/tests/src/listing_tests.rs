use crate::fixtures::test_app::TestApp;
use serde_json::{Value, json};

#[tokio::test]
async fn farmer_creates_listing_with_defaults() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "prakash").await;

    let resp = app
        .auth_post("/api/listings", &farmer.access_token)
        .json(&json!({
            "quantity_tons": 40.0,
            "price_per_ton": 3100.0,
            "location": "Satara",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["crop_type"], "sugarcane");
    assert_eq!(json["farmer_id"], farmer.id);
    assert_eq!(json["quantity_tons"], 40.0);
}

#[tokio::test]
async fn only_farmers_create_listings() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "kisan_sugar").await;

    let resp = app
        .auth_post("/api/listings", &factory.access_token)
        .json(&json!({ "quantity_tons": 10.0, "price_per_ton": 3000.0, "location": "Pune" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn listing_rejects_non_positive_values() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "mahesh").await;

    for body in [
        json!({ "quantity_tons": 0.0, "price_per_ton": 3000.0, "location": "Pune" }),
        json!({ "quantity_tons": 5.0, "price_per_ton": -1.0, "location": "Pune" }),
        json!({ "quantity_tons": 5.0, "price_per_ton": 3000.0, "location": "" }),
    ] {
        let resp = app
            .auth_post("/api/listings", &farmer.access_token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 422, "body: {body}");
    }
}

#[tokio::test]
async fn search_filters_by_crop_and_location() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "dattatray").await;
    let factory = app.register_user("factory", "warna").await;

    app.create_listing(&farmer, 20.0, 3000.0).await;
    let resp = app
        .auth_post("/api/listings", &farmer.access_token)
        .json(&json!({
            "crop_type": "Jaggery-Cane",
            "quantity_tons": 8.0,
            "price_per_ton": 2800.0,
            "location": "Nashik (East)",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let resp = app
        .auth_get("/api/listings?crop_type=jaggery-cane", &factory.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["location"], "Nashik (East)");

    // Location is a case-insensitive substring match; regex characters are literal.
    let resp = app
        .auth_get("/api/listings?location=nashik%20(", &factory.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 1);

    let resp = app
        .auth_get("/api/listings?per_page=1&page=2", &factory.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["total_pages"], 2);
    assert_eq!(json["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn only_owner_updates_or_deletes() {
    let app = TestApp::spawn().await;
    let owner = app.register_user("farmer", "owner_farmer").await;
    let other = app.register_user("farmer", "other_farmer").await;
    let listing = app.create_listing(&owner, 30.0, 3000.0).await;
    let path = format!("/api/listings/{}", listing["id"].as_str().unwrap());

    let resp = app
        .auth_put(&path, &other.access_token)
        .json(&json!({ "price_per_ton": 1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_put(&path, &owner.access_token)
        .json(&json!({ "price_per_ton": 3250.0, "description": "Irrigated, 12 months" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["price_per_ton"], 3250.0);
    assert_eq!(json["quantity_tons"], 30.0);

    let resp = app.auth_delete(&path, &other.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let resp = app.auth_delete(&path, &owner.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app.auth_get(&path, &owner.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn farmer_sees_only_own_listings() {
    let app = TestApp::spawn().await;
    let a = app.register_user("farmer", "farmer_a").await;
    let b = app.register_user("farmer", "farmer_b").await;
    app.create_listing(&a, 10.0, 3000.0).await;
    app.create_listing(&a, 11.0, 3000.0).await;
    app.create_listing(&b, 12.0, 3000.0).await;

    let resp = app
        .auth_get("/api/farmer/listings", &a.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 2);
    for item in json["items"].as_array().unwrap() {
        assert_eq!(item["farmer_id"], a.id);
    }
}

#[tokio::test]
async fn malformed_listing_id_is_bad_request() {
    let app = TestApp::spawn().await;
    let farmer = app.register_user("farmer", "badid").await;
    let resp = app
        .auth_get("/api/listings/xyz", &farmer.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
