//! Integration tests for team creation and lookup.

mod common;

use common::{png_bytes, TestHarness};
use reqwest::multipart::{Form, Part};
use std::net::SocketAddr;

async fn upload_logo(addr: SocketAddr, cookie: &str, name: &str) -> String {
    let part = Part::bytes(png_bytes(200, 100))
        .file_name(name.to_string())
        .mime_str("image/png")
        .unwrap();
    let upload: serde_json::Value = reqwest::Client::new()
        .post(format!("http://{addr}/upload"))
        .header("Cookie", cookie)
        .multipart(Form::new().part("file", part))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    upload["url"].as_str().unwrap().to_string()
}

async fn new_team(
    addr: SocketAddr,
    cookie: &str,
    body: serde_json::Value,
) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/newTeam"))
        .header("Cookie", cookie)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn create_team_without_logo() {
    let (h, addr) = TestHarness::with_server().await;
    let user = h.create_user("ada@example.com", "ada");
    let cookie = h.login(addr, "ada@example.com").await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/newTeam"))
        .header("Cookie", &cookie)
        .json(&serde_json::json!({ "name": "  Rockets  ", "logo": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["name"], "Rockets");
    assert!(json["logo"].is_null());
    assert_eq!(json["owner_id"], user.id.to_string());
}

#[tokio::test]
async fn create_team_with_uploaded_logo() {
    let (h, addr) = TestHarness::with_server().await;
    h.create_user("ada@example.com", "ada");
    let cookie = h.login(addr, "ada@example.com").await;
    let client = reqwest::Client::new();

    let part = Part::bytes(png_bytes(1200, 600))
        .file_name("rockets.png")
        .mime_str("image/png")
        .unwrap();
    let upload: serde_json::Value = client
        .post(format!("http://{addr}/upload"))
        .header("Cookie", &cookie)
        .multipart(Form::new().part("file", part))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let logo = upload["url"].as_str().unwrap();

    let resp = client
        .post(format!("http://{addr}/newTeam"))
        .header("Cookie", &cookie)
        .json(&serde_json::json!({ "name": "Rockets", "logo": logo }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let team: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(team["logo"], logo);
}

#[tokio::test]
async fn create_team_with_external_logo_url() {
    let (h, addr) = TestHarness::with_server().await;
    h.create_user("ada@example.com", "ada");
    let cookie = h.login(addr, "ada@example.com").await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/newTeam"))
        .header("Cookie", &cookie)
        .json(&serde_json::json!({ "name": "Rockets", "logo": "https://cdn.example.com/r.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let team: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(team["logo"], "https://cdn.example.com/r.png");
}

#[tokio::test]
async fn create_team_rejects_bad_input() {
    let (h, addr) = TestHarness::with_server().await;
    h.create_user("ada@example.com", "ada");
    let cookie = h.login(addr, "ada@example.com").await;
    let client = reqwest::Client::new();

    for body in [
        serde_json::json!({ "name": "   " }),
        serde_json::json!({ "name": "Rockets", "logo": "javascript:alert(1)" }),
        serde_json::json!({ "name": "Rockets", "logo": "/uploads/../synedrius.db" }),
        serde_json::json!({ "name": "Rockets", "logo": "/uploads/never-uploaded.png" }),
    ] {
        let resp = client
            .post(format!("http://{addr}/newTeam"))
            .header("Cookie", &cookie)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "body: {body}");
    }

    let teams: Vec<serde_json::Value> = client
        .get(format!("http://{addr}/api/teams"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(teams.is_empty());
}

#[tokio::test]
async fn create_team_rejects_logo_uploaded_by_someone_else() {
    let (h, addr) = TestHarness::with_server().await;
    h.create_user("ada@example.com", "ada");
    h.create_user("eve@example.com", "eve");
    let ada = h.login(addr, "ada@example.com").await;
    let eve = h.login(addr, "eve@example.com").await;

    let logo = upload_logo(addr, &ada, "rockets.png").await;
    let resp = new_team(addr, &ada, serde_json::json!({ "name": "Rockets", "logo": logo })).await;
    assert_eq!(resp.status(), 201);

    let resp = new_team(addr, &eve, serde_json::json!({ "name": "Decoy", "logo": logo })).await;
    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Logo must reference an image you uploaded");

    // Eve replacing the logo of a team she does own cannot reach Ada's file
    let decoy = new_team(addr, &eve, serde_json::json!({ "name": "Decoy" }))
        .await
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let part = Part::bytes(png_bytes(50, 50))
        .file_name("decoy.png")
        .mime_str("image/png")
        .unwrap();
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/upload"))
        .header("Cookie", &eve)
        .multipart(
            Form::new()
                .text("teamId", decoy["id"].as_str().unwrap().to_string())
                .part("file", part),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let name = logo.strip_prefix("/uploads/").unwrap();
    assert!(h.uploads_dir().join(name).exists());
}

#[tokio::test]
async fn create_team_rejects_logo_already_in_use() {
    let (h, addr) = TestHarness::with_server().await;
    h.create_user("ada@example.com", "ada");
    let cookie = h.login(addr, "ada@example.com").await;

    let logo = upload_logo(addr, &cookie, "rockets.png").await;
    let first = new_team(addr, &cookie, serde_json::json!({ "name": "Rockets", "logo": logo })).await;
    assert_eq!(first.status(), 201);

    let second = new_team(addr, &cookie, serde_json::json!({ "name": "Comets", "logo": logo })).await;
    assert_eq!(second.status(), 409);
    let json: serde_json::Value = second.json().await.unwrap();
    assert_eq!(json["code"], "conflict");
}

#[tokio::test]
async fn create_team_rejects_deleted_upload() {
    let (h, addr) = TestHarness::with_server().await;
    h.create_user("ada@example.com", "ada");
    let cookie = h.login(addr, "ada@example.com").await;

    let logo = upload_logo(addr, &cookie, "rockets.png").await;
    std::fs::remove_file(h.uploads_dir().join(logo.strip_prefix("/uploads/").unwrap())).unwrap();

    let resp = new_team(addr, &cookie, serde_json::json!({ "name": "Rockets", "logo": logo })).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn create_team_requires_login() {
    let (_h, addr) = TestHarness::with_server().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/newTeam"))
        .json(&serde_json::json!({ "name": "Rockets" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "unauthorized");
}

#[tokio::test]
async fn list_only_own_teams() {
    let (h, addr) = TestHarness::with_server().await;
    let ada = h.create_user("ada@example.com", "ada");
    let bob = h.create_user("bob@example.com", "bob");
    h.create_team("Ada's team", ada.id);
    h.create_team("Bob's team", bob.id);
    let cookie = h.login(addr, "ada@example.com").await;

    let teams: Vec<serde_json::Value> = reqwest::Client::new()
        .get(format!("http://{addr}/api/teams"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0]["name"], "Ada's team");
}

#[tokio::test]
async fn get_team_detail() {
    let (h, addr) = TestHarness::with_server().await;
    let ada = h.create_user("ada@example.com", "ada");
    let bob = h.create_user("bob@example.com", "bob");
    let team = h.create_team("Rockets", ada.id);
    let foreign = h.create_team("Bob's team", bob.id);
    let cookie = h.login(addr, "ada@example.com").await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{addr}/api/teams/{}", team.id))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["name"], "Rockets");
    assert_eq!(json["members"].as_array().unwrap().len(), 1);
    assert_eq!(json["members"][0]["user_id"], ada.id.to_string());

    let status = |path: String| {
        let client = client.clone();
        let cookie = cookie.clone();
        async move {
            client
                .get(format!("http://{addr}{path}"))
                .header("Cookie", cookie)
                .send()
                .await
                .unwrap()
                .status()
        }
    };

    assert_eq!(status(format!("/api/teams/{}", foreign.id)).await, 403);
    assert_eq!(
        status(format!("/api/teams/{}", synedrius_common::TeamId::new())).await,
        404
    );
    assert_eq!(status("/api/teams/not-a-uuid".to_string()).await, 400);
}
