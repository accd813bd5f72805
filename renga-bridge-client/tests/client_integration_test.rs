//! Client round trips against a fake plugin.

mod common;

use common::{client_for, spawn_fake_plugin, Reply};
use renga_bridge_client::commands::get_walls_request;
use renga_bridge_client::PointIdentityTracker;
use renga_bridge_core::protocol::{
    GetWallsResponse, Point3, PointOutcome, Response, UpdatePointsResponse, WallInfo,
};
use renga_bridge_core::BridgeError;
use serde_json::json;

fn frame_of(response: &Response) -> Reply {
    Reply::Frame(response.to_bytes().unwrap().to_vec())
}

#[tokio::test]
async fn test_update_points_round_trip_records_column_ids() {
    let (port, plugin) = spawn_fake_plugin(2, |request| {
        let points = request.data["points"].as_array().unwrap();
        let results: Vec<PointOutcome> = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let client_id = p["grasshopperGuid"].as_str().map(str::to_string);
                let message = if p["rengaColumnGuid"].is_null() {
                    "Column created"
                } else {
                    "Column updated"
                };
                PointOutcome::ok(message, (100 + i).to_string(), client_id)
            })
            .collect();
        let body = serde_json::to_value(UpdatePointsResponse { results }).unwrap();
        frame_of(&Response::success(request.id.clone(), body))
    })
    .await;

    let client = client_for(port);
    let mut tracker = PointIdentityTracker::new();
    let positions = [Point3::new(0.0, 0.0, 0.0), Point3::new(6000.0, 0.0, 0.0)];

    let first = client
        .update_points(&tracker.build_request(&positions, &[3200.0]))
        .await
        .unwrap();
    assert_eq!(first.results.len(), 2);
    assert!(first.results.iter().all(|r| r.message == "Column created"));
    assert_eq!(tracker.record_results(&first), 2);

    let second = client
        .update_points(&tracker.build_request(&positions, &[3200.0]))
        .await
        .unwrap();
    assert!(second.results.iter().all(|r| r.message == "Column updated"));

    let received = plugin.await.unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[1].data["points"][0]["rengaColumnGuid"], "100");
    assert_eq!(received[1].data["points"][1]["height"], 3200.0);
}

#[tokio::test]
async fn test_get_walls_typed() {
    let (port, plugin) = spawn_fake_plugin(1, |request| {
        let walls = GetWallsResponse {
            walls: vec![WallInfo {
                id: 7,
                name: "Wall 7".to_string(),
                position: Some(Point3::new(0.0, 0.0, 0.0)),
                height: 3000.0,
                thickness: 200.0,
                baseline: None,
                mesh: None,
            }],
        };
        frame_of(&Response::success(
            request.id.clone(),
            serde_json::to_value(walls).unwrap(),
        ))
    })
    .await;

    let walls = client_for(port).get_walls().await.unwrap();
    assert_eq!(walls.len(), 1);
    assert_eq!(walls[0].name, "Wall 7");
    assert_eq!(walls[0].thickness, 200.0);

    let received = plugin.await.unwrap();
    assert_eq!(received[0].command, "get_walls");
    assert_eq!(received[0].data, json!({}));
}

#[tokio::test]
async fn test_remote_failure_becomes_remote_error() {
    let (port, _plugin) = spawn_fake_plugin(1, |request| {
        frame_of(&Response::failure(request.id.clone(), "no active model"))
    })
    .await;

    let err = client_for(port).get_walls().await.unwrap_err();
    assert!(matches!(err, BridgeError::Remote(ref m) if m == "no active model"));
}

#[tokio::test]
async fn test_mismatched_id_returned_as_is() {
    let (port, _plugin) = spawn_fake_plugin(1, |_| {
        frame_of(&Response::success("someone-else", json!({"walls": []})))
    })
    .await;

    let response = client_for(port).send(&get_walls_request()).await;
    assert!(response.success);
    assert_eq!(response.id, "someone-else");
}

#[tokio::test]
async fn test_closed_without_response_yields_failure() {
    let (port, _plugin) = spawn_fake_plugin(1, |_| Reply::Close).await;

    let request = get_walls_request();
    let response = client_for(port).send(&request).await;
    assert!(!response.success);
    assert_eq!(response.id, request.id);
    assert!(response.error.is_some());
}

#[tokio::test]
async fn test_oversized_response_length_yields_failure() {
    let (port, _plugin) = spawn_fake_plugin(1, |_| {
        Reply::Raw((64 * 1024 * 1024i32).to_be_bytes().to_vec())
    })
    .await;

    let request = get_walls_request();
    let response = client_for(port).send(&request).await;
    assert!(!response.success);
    assert!(response
        .error
        .unwrap()
        .contains("invalid message length: 67108864"));
}

#[tokio::test]
async fn test_garbage_response_body_yields_failure() {
    let (port, _plugin) = spawn_fake_plugin(1, |_| Reply::Frame(b"not json".to_vec())).await;

    let response = client_for(port).send(&get_walls_request()).await;
    assert!(!response.success);
    assert!(response.error.unwrap().contains("invalid response"));
}
