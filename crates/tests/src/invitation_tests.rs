use crate::fixtures::{seed::SeededUser, test_app::TestApp};
use bson::{doc, oid::ObjectId};
use serde_json::{Value, json};

async fn invite(app: &TestApp, sender: &SeededUser, path: &str, body: Value) -> reqwest::Response {
    app.auth_post(path, &sender.access_token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn respond(app: &TestApp, user: &SeededUser, base: &str, invitation_id: &str, action: &str) -> reqwest::Response {
    app.auth_post(&format!("{base}/invitations/{invitation_id}/respond"), &user.access_token)
        .json(&json!({ "action": action, "message": "noted" }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn factory_invites_hhm_and_duplicate_pending_conflicts() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "someshwar").await;
    let hhm = app.register_user("hhm", "prabhu").await;

    let resp = invite(
        &app,
        &factory,
        "/api/factory/invitations",
        json!({ "recipient_id": hhm.id, "personal_message": "Join our 2025 season" }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["invitation_type"], "factory-to-hhm");
    assert_eq!(json["sender_id"], factory.id);
    assert_eq!(json["recipient_id"], hhm.id);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["priority"], "normal");
    assert!(json["worker_id"].is_null());

    let resp = invite(&app, &factory, "/api/factory/invitations", json!({ "recipient_id": hhm.id })).await;
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "conflict");
}

#[tokio::test]
async fn opposite_directions_do_not_collide() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "vasantdada").await;
    let hhm = app.register_user("hhm", "dilip").await;

    let resp = invite(&app, &factory, "/api/factory/invitations", json!({ "recipient_id": hhm.id })).await;
    assert_eq!(resp.status().as_u16(), 201);

    let resp = invite(
        &app,
        &hhm,
        "/api/hhm/invitations",
        json!({ "invitation_type": "hhm-to-factory", "recipient_id": factory.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 201);
}

#[tokio::test]
async fn worker_invitations_from_many_hhms_do_not_collide() {
    // hhm-to-worker invitations leave factory_id null; a type-blind unique
    // index over (factory_id, hhm_id) or (worker_id, schedule_id) would
    // reject the second one.
    let app = TestApp::spawn().await;
    let worker_a = app.register_user("labour", "worker_a").await;
    let worker_b = app.register_user("labour", "worker_b").await;

    for name in ["hhm_one", "hhm_two"] {
        let hhm = app.register_user("hhm", name).await;
        for worker in [&worker_a, &worker_b] {
            let resp = invite(
                &app,
                &hhm,
                "/api/hhm/invitations",
                json!({ "invitation_type": "hhm-to-worker", "recipient_id": worker.id, "offered_wage": 600.0 }),
            )
            .await;
            assert_eq!(resp.status().as_u16(), 201, "{name} -> {}", worker.username);
        }
    }

    let resp = app
        .auth_get("/api/worker/invitations", &worker_a.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 2);
}

#[tokio::test]
async fn schedule_scoped_worker_invitations_are_unique_per_schedule() {
    let app = TestApp::spawn().await;
    let hhm = app.register_user("hhm", "shivaji").await;
    let worker = app.register_user("labour", "sambhaji").await;
    let first = app.create_schedule(&hhm, 2).await;
    let second = app.create_schedule(&hhm, 2).await;

    let body = |schedule: &Value| {
        json!({
            "invitation_type": "hhm-to-worker",
            "recipient_id": worker.id,
            "schedule_id": schedule["id"],
        })
    };

    let resp = invite(&app, &hhm, "/api/hhm/invitations", body(&first)).await;
    assert_eq!(resp.status().as_u16(), 201);
    let resp = invite(&app, &hhm, "/api/hhm/invitations", body(&first)).await;
    assert_eq!(resp.status().as_u16(), 409);
    let resp = invite(&app, &hhm, "/api/hhm/invitations", body(&second)).await;
    assert_eq!(resp.status().as_u16(), 201);

    // Schedule-less invitations are deduplicated per (hhm, worker).
    let plain = json!({ "invitation_type": "hhm-to-worker", "recipient_id": worker.id });
    let resp = invite(&app, &hhm, "/api/hhm/invitations", plain.clone()).await;
    assert_eq!(resp.status().as_u16(), 201);
    let resp = invite(&app, &hhm, "/api/hhm/invitations", plain).await;
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn answered_invitation_frees_the_pair() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "kumbhi").await;
    let hhm = app.register_user("hhm", "ashok").await;

    let resp = invite(&app, &factory, "/api/factory/invitations", json!({ "recipient_id": hhm.id })).await;
    let json: Value = resp.json().await.unwrap();
    let resp = respond(&app, &hhm, "/api/hhm", json["id"].as_str().unwrap(), "reject").await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "rejected");
    assert_eq!(json["response_message"], "noted");

    let resp = invite(&app, &factory, "/api/factory/invitations", json!({ "recipient_id": hhm.id })).await;
    assert_eq!(resp.status().as_u16(), 201);
}

#[tokio::test]
async fn accepting_factory_invitation_associates_both_sides() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "rajarambapu").await;
    let hhm = app.register_user("hhm", "yashwant").await;

    let resp = invite(&app, &factory, "/api/factory/invitations", json!({ "recipient_id": hhm.id })).await;
    let json: Value = resp.json().await.unwrap();
    let invitation_id = json["id"].as_str().unwrap().to_string();

    // Only the recipient may answer.
    let resp = respond(&app, &factory, "/api/factory", &invitation_id, "accept").await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = respond(&app, &hhm, "/api/hhm", &invitation_id, "accept").await;
    assert_eq!(resp.status().as_u16(), 200);

    // A second answer is refused.
    let resp = respond(&app, &hhm, "/api/hhm", &invitation_id, "reject").await;
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app.auth_get("/api/hhm/factories", &hhm.access_token).send().await.unwrap();
    let factories: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(factories.len(), 1);
    assert_eq!(factories[0]["id"], factory.id);

    let resp = app.auth_get("/api/factory/hhms", &factory.access_token).send().await.unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["id"], hhm.id);
}

#[tokio::test]
async fn accepting_worker_invitation_links_and_assigns() {
    let app = TestApp::spawn().await;
    let hhm = app.register_user("hhm", "nana").await;
    let previous_hhm = app.register_user("hhm", "tatya").await;
    let worker = app.register_user("labour", "bapu").await;
    let schedule = app.create_schedule(&hhm, 2).await;

    // Worker first joins another HHM through an application.
    let other_schedule = app.create_schedule(&previous_hhm, 2).await;
    let resp = app
        .auth_post(
            &format!("/api/worker/schedules/{}/apply", other_schedule["id"].as_str().unwrap()),
            &worker.access_token,
        )
        .send()
        .await
        .unwrap();
    let application: Value = resp.json().await.unwrap();
    app.auth_post(
        &format!("/api/hhm/applications/{}/respond", application["id"].as_str().unwrap()),
        &previous_hhm.access_token,
    )
    .json(&json!({ "action": "accept" }))
    .send()
    .await
    .unwrap();

    let resp = invite(
        &app,
        &hhm,
        "/api/hhm/invitations",
        json!({
            "invitation_type": "hhm-to-worker",
            "recipient_id": worker.id,
            "schedule_id": schedule["id"],
            "priority": "high",
        }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["priority"], "high");

    let resp = respond(&app, &worker, "/api/worker", json["id"].as_str().unwrap(), "accept").await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.auth_get("/api/worker/profile", &worker.access_token).send().await.unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["profile"]["hhm_id"], hhm.id);

    let resp = app.auth_get("/api/hhm/schedules", &hhm.access_token).send().await.unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["items"][0]["assigned_workers"], json!([worker.id]));

    // The worker moved: the previous HHM no longer lists them.
    let resp = app
        .auth_get("/api/hhm/workers", &previous_hhm.access_token)
        .send()
        .await
        .unwrap();
    let workers: Vec<Value> = resp.json().await.unwrap();
    assert!(workers.is_empty());
}

#[tokio::test]
async fn senders_and_recipients_are_role_checked() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "shree").await;
    let farmer = app.register_user("farmer", "bhau").await;
    let hhm = app.register_user("hhm", "appa").await;

    // Recipient must hold the recipient role.
    let resp = invite(&app, &factory, "/api/factory/invitations", json!({ "recipient_id": farmer.id })).await;
    assert_eq!(resp.status().as_u16(), 422);

    // A factory cannot send another role's invitation type.
    let resp = invite(
        &app,
        &factory,
        "/api/factory/invitations",
        json!({ "invitation_type": "hhm-to-worker", "recipient_id": hhm.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);

    // HHMs send two types and must say which.
    let resp = invite(&app, &hhm, "/api/hhm/invitations", json!({ "recipient_id": factory.id })).await;
    assert_eq!(resp.status().as_u16(), 422);

    // Workers have no send endpoint.
    let worker = app.register_user("labour", "dada").await;
    let resp = invite(&app, &worker, "/api/worker/invitations", json!({ "recipient_id": hhm.id })).await;
    assert_eq!(resp.status().as_u16(), 405);
}

#[tokio::test]
async fn expired_invitation_cannot_be_answered() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "datta").await;
    let hhm = app.register_user("hhm", "pandu").await;

    let resp = invite(&app, &factory, "/api/factory/invitations", json!({ "recipient_id": hhm.id })).await;
    let json: Value = resp.json().await.unwrap();
    let invitation_id = json["id"].as_str().unwrap().to_string();

    app.db
        .collection::<bson::Document>("invitations")
        .update_one(
            doc! { "_id": ObjectId::parse_str(&invitation_id).unwrap() },
            doc! { "$set": { "expires_at": bson::DateTime::from_millis(0) } },
        )
        .await
        .unwrap();

    let resp = respond(&app, &hhm, "/api/hhm", &invitation_id, "accept").await;
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app
        .auth_get("/api/factory/invitations?direction=sent&status=expired", &factory.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 1);

    // The expired invitation no longer blocks a new one.
    let resp = invite(&app, &factory, "/api/factory/invitations", json!({ "recipient_id": hhm.id })).await;
    assert_eq!(resp.status().as_u16(), 201);
}

#[tokio::test]
async fn sweep_expires_overdue_invitations() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "sweeper_factory").await;
    let hhm = app.register_user("hhm", "sweeper_hhm").await;

    let resp = invite(
        &app,
        &factory,
        "/api/factory/invitations",
        json!({ "recipient_id": hhm.id, "expires_in_hours": 1 }),
    )
    .await;
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "pending");

    assert_eq!(app.state.invitations.expire_overdue().await.unwrap(), 0);

    app.db
        .collection::<bson::Document>("invitations")
        .update_many(doc! {}, doc! { "$set": { "expires_at": bson::DateTime::from_millis(0) } })
        .await
        .unwrap();
    assert_eq!(app.state.invitations.expire_overdue().await.unwrap(), 1);

    let stored = app
        .db
        .collection::<bson::Document>("invitations")
        .find_one(doc! {})
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_str("status").unwrap(), "expired");
}

#[tokio::test]
async fn mailbox_direction_filters() {
    let app = TestApp::spawn().await;
    let factory = app.register_user("factory", "mailbox_factory").await;
    let hhm = app.register_user("hhm", "mailbox_hhm").await;
    let worker = app.register_user("labour", "mailbox_worker").await;

    invite(&app, &factory, "/api/factory/invitations", json!({ "recipient_id": hhm.id })).await;
    invite(
        &app,
        &hhm,
        "/api/hhm/invitations",
        json!({ "invitation_type": "hhm-to-worker", "recipient_id": worker.id }),
    )
    .await;
    invite(
        &app,
        &hhm,
        "/api/hhm/invitations",
        json!({ "invitation_type": "hhm-to-factory", "recipient_id": factory.id }),
    )
    .await;

    let count = |path: &'static str, token: String| {
        let req = app.auth_get(path, &token);
        async move {
            let json: Value = req.send().await.unwrap().json().await.unwrap();
            json["total"].as_u64().unwrap()
        }
    };

    assert_eq!(count("/api/hhm/invitations", hhm.access_token.clone()).await, 1);
    assert_eq!(count("/api/hhm/invitations?direction=sent", hhm.access_token.clone()).await, 2);
    assert_eq!(count("/api/factory/invitations", factory.access_token.clone()).await, 1);
    assert_eq!(count("/api/factory/invitations?direction=sent", factory.access_token.clone()).await, 1);
    assert_eq!(count("/api/worker/invitations", worker.access_token.clone()).await, 1);
}

#[tokio::test]
async fn concurrent_schedule_less_invitations_keep_one_pending() {
    let app = TestApp::spawn().await;
    let hhm = app.register_user("hhm", "racing_hhm").await;
    let worker = app.register_user("labour", "racing_worker").await;

    let body = json!({ "invitation_type": "hhm-to-worker", "recipient_id": worker.id });
    let requests = (0..5).map(|_| {
        app.auth_post("/api/hhm/invitations", &hhm.access_token)
            .json(&body)
            .send()
    });
    let statuses: Vec<u16> = futures::future::join_all(requests)
        .await
        .into_iter()
        .map(|r| r.unwrap().status().as_u16())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == 201).count(), 1, "{statuses:?}");
    assert_eq!(statuses.iter().filter(|s| **s == 409).count(), 4, "{statuses:?}");

    let pending = app
        .db
        .collection::<bson::Document>("invitations")
        .count_documents(doc! {
            "hhm_id": ObjectId::parse_str(&hhm.id).unwrap(),
            "worker_id": ObjectId::parse_str(&worker.id).unwrap(),
            "status": "pending",
        })
        .await
        .unwrap();
    assert_eq!(pending, 1);
}

#[tokio::test]
async fn full_schedule_leaves_worker_invitation_pending() {
    let app = TestApp::spawn().await;
    let hhm = app.register_user("hhm", "full_hhm").await;
    let seated = app.register_user("labour", "seated").await;
    let invited = app.register_user("labour", "invited").await;
    let schedule = app.create_schedule(&hhm, 1).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let resp = invite(
        &app,
        &hhm,
        "/api/hhm/invitations",
        json!({
            "invitation_type": "hhm-to-worker",
            "recipient_id": invited.id,
            "schedule_id": schedule_id,
        }),
    )
    .await;
    let invitation: Value = resp.json().await.unwrap();
    let invitation_id = invitation["id"].as_str().unwrap();

    // Another worker takes the only seat first.
    let resp = app
        .auth_post(&format!("/api/worker/schedules/{schedule_id}/apply"), &seated.access_token)
        .send()
        .await
        .unwrap();
    let application: Value = resp.json().await.unwrap();
    let resp = app
        .auth_post(
            &format!("/api/hhm/applications/{}/respond", application["id"].as_str().unwrap()),
            &hhm.access_token,
        )
        .json(&json!({ "action": "accept" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = respond(&app, &invited, "/api/worker", invitation_id, "accept").await;
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app
        .auth_get("/api/worker/invitations?status=pending", &invited.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["id"], invitation_id);
    assert!(json["items"][0]["responded_at"].is_null());

    let resp = app.auth_get("/api/hhm/schedules", &hhm.access_token).send().await.unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["items"][0]["assigned_workers"], json!([seated.id]));

    // The rejected acceptance did not link the worker either.
    let resp = app.auth_get("/api/worker/profile", &invited.access_token).send().await.unwrap();
    let json: Value = resp.json().await.unwrap();
    assert!(json["profile"]["hhm_id"].is_null());
}

#[tokio::test]
async fn deleting_schedule_expires_its_worker_invitations() {
    let app = TestApp::spawn().await;
    let hhm = app.register_user("hhm", "closing_hhm").await;
    let worker = app.register_user("labour", "waiting_worker").await;
    let schedule = app.create_schedule(&hhm, 2).await;
    let schedule_id = schedule["id"].as_str().unwrap();

    let resp = invite(
        &app,
        &hhm,
        "/api/hhm/invitations",
        json!({
            "invitation_type": "hhm-to-worker",
            "recipient_id": worker.id,
            "schedule_id": schedule_id,
        }),
    )
    .await;
    let invitation: Value = resp.json().await.unwrap();

    let resp = app
        .auth_delete(&format!("/api/hhm/schedules/{schedule_id}"), &hhm.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get("/api/worker/invitations?status=expired", &worker.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["id"], invitation["id"]);

    let resp = respond(&app, &worker, "/api/worker", invitation["id"].as_str().unwrap(), "accept").await;
    assert_eq!(resp.status().as_u16(), 422);
}
