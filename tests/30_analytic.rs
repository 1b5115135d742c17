mod common;

use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

use common::{ScriptedAnalytics, TestServer};

fn data_frames(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .filter_map(|json| serde_json::from_str(json).ok())
        .collect()
}

#[tokio::test]
async fn stream_relays_every_sample_then_closes() -> Result<()> {
    let server = TestServer::start_with(ScriptedAnalytics::new(3)).await?;

    let res = server
        .client
        .get(server.url("/analytic?project_id=concert"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[reqwest::header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(res.headers()[reqwest::header::CACHE_CONTROL], "no-cache");

    let body = res.text().await?;
    let frames = data_frames(&body);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0]["project_id"], "concert");
    assert_eq!(frames[2]["total_users_in_queue"], 30);

    let closing = body.lines().last().unwrap_or_default();
    let envelope: Value = serde_json::from_str(closing)?;
    assert_eq!(envelope["status"], 200);
    assert_eq!(envelope["data"], "Stream done");

    Ok(())
}

#[tokio::test]
async fn live_stream_delivers_frames_as_they_arrive() -> Result<()> {
    let server = TestServer::start_with(ScriptedAnalytics::new(2).hold_open()).await?;

    let mut res = server
        .client
        .get(server.url("/analytic?project_id=concert"))
        .send()
        .await?;

    let mut received = String::new();
    while data_frames(&received).len() < 2 {
        let chunk = tokio::time::timeout(Duration::from_secs(5), res.chunk()).await??;
        match chunk {
            Some(bytes) => received.push_str(&String::from_utf8_lossy(&bytes)),
            None => anyhow::bail!("stream ended early: {:?}", received),
        }
    }
    assert_eq!(data_frames(&received)[1]["total_users"], 22);

    // Leaving must not take the server down with it
    drop(res);
    let res = server.client.get(server.url("/ping")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn missing_project_id_fails_to_open() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client.get(server.url("/analytic")).send().await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await?;
    assert_eq!(body["status"], 500);

    Ok(())
}

#[tokio::test]
async fn snapshot_returns_the_first_sample() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.register("owner@queue.dev").await?;

    let res = server
        .client
        .get(server.url("/analytic/concert"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["project_id"], "concert");
    assert_eq!(body["data"]["total_users_in_room"], 1);

    let res = server.client.get(server.url("/analytic/concert")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
