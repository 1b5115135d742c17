mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn create_list_and_detail() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.tenant_with_project("owner@queue.dev", "concert").await?;

    let list: Value = server
        .client
        .get(server.url("/project/list"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(list["data"]["projects"][0]["id"], "concert");

    let res = server
        .client
        .get(server.url("/project/detail/concert"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let detail: Value = res.json().await?;
    assert_eq!(detail["data"]["configuration"]["project_id"], "concert");
    assert_eq!(detail["data"]["configuration"]["is_configure"], false);

    Ok(())
}

#[tokio::test]
async fn detail_is_scoped_to_the_tenant() -> Result<()> {
    let server = TestServer::start().await?;
    server.tenant_with_project("owner@queue.dev", "concert").await?;
    let other = server.register("other@queue.dev").await?;

    let res = server
        .client
        .get(server.url("/project/detail/concert"))
        .bearer_auth(&other)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Project not found");

    Ok(())
}

#[tokio::test]
async fn invalid_id_and_wrong_method() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.register("owner@queue.dev").await?;

    let res = server
        .client
        .post(server.url("/project"))
        .bearer_auth(&token)
        .json(&json!({ "id": "Abc", "name": "Concert" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .delete(server.url("/project/list"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Method not allowed");

    Ok(())
}

#[tokio::test]
async fn health_goes_through_the_infra_manager() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.tenant_with_project("owner@queue.dev", "concert").await?;

    let body: Value = server
        .client
        .get(server.url("/project/health/concert"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"], json!({ "id": "concert", "healthiness": true }));

    let res = server
        .client
        .get(server.url("/project/health/unknown"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn config_update_registers_and_marks_configured() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.tenant_with_project("owner@queue.dev", "concert").await?;

    let update = json!({
        "project_id": "concert",
        "threshold": 50,
        "session_time": 10,
        "host": "concert.queue.dev",
        "base_url": "/tickets",
        "max_users_in_queue": 500,
        "queue_start": "2024-06-01T09:00:00",
        "queue_end": "2024-06-01T18:00:00",
    });
    let res = server
        .client
        .put(server.url("/project/config"))
        .bearer_auth(&token)
        .json(&update)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"], "Project configuration updated");

    let registered = server.infra.registered.lock().unwrap().clone();
    assert_eq!(
        registered,
        vec![json!({ "project_id": "concert", "project_domain": "concert.queue.dev", "url_path": "/tickets" })]
    );

    let detail: Value = server
        .client
        .get(server.url("/project/detail/concert"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(detail["data"]["configuration"]["is_configure"], true);
    assert_eq!(detail["data"]["configuration"]["host"], "concert.queue.dev");

    let mut bad = update.clone();
    bad["queue_end"] = json!("tomorrow");
    let res = server
        .client
        .put(server.url("/project/config"))
        .bearer_auth(&token)
        .json(&bad)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Invalid queue end time format");

    Ok(())
}

#[tokio::test]
async fn clear_needs_no_token() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.tenant_with_project("owner@queue.dev", "concert").await?;

    let res = server.client.delete(server.url("/project/clear")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(*server.infra.restarts.lock().unwrap(), 1);

    let list: Value = server
        .client
        .get(server.url("/project/list"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(list["data"]["projects"], json!([]));

    Ok(())
}
