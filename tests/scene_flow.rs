use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use scene_sync::config::Config;
use scene_sync::db::{FileStore, MemoryEngine};
use scene_sync::websocket::{handle_text, teardown};
use scene_sync::AppState;

fn app_state(root: &std::path::Path) -> AppState {
    let engine = Arc::new(MemoryEngine::new(FileStore::new(root)));
    AppState::new(engine, &Config::default())
}

fn frame(value: Value) -> String {
    value.to_string()
}

async fn next(rx: &mut mpsc::Receiver<String>) -> Value {
    let text = rx.recv().await.expect("connection queue closed");
    serde_json::from_str(&text).expect("hub sent invalid json")
}

fn added(uid: &str) -> String {
    frame(json!({
        "Event": "ITEM_ADDED",
        "Uid": uid,
        "Session": "default",
        "ObjectType": "Text",
        "Position": [0.0, 0.0, 0.0],
        "Scale": [1.0, 1.0, 1.0],
        "Rotation": [0.0, 0.0, 0.0, 1.0],
        "Text": "note"
    }))
}

fn selection(uid: &str, selected: bool) -> String {
    frame(json!({"Event": "ITEM_SELECTION_CHANGED", "Uid": uid, "IsSelected": selected}))
}

fn moved(uid: &str, x: f64) -> String {
    frame(json!({"Event": "ITEM_MOVED", "Uid": uid, "Position": [x, 0.0, 0.0]}))
}

async fn position(state: &AppState, uid: &str) -> [f64; 3] {
    state.coordinator.get_object(uid).await.unwrap().unwrap().position
}

#[tokio::test]
async fn accepted_frames_are_relayed_to_peers_only() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path());
    let (a, mut rx_a) = state.hub.register().await;
    let (_b, mut rx_b) = state.hub.register().await;

    handle_text(&state, a, &added("o1")).await;

    let relayed = next(&mut rx_b).await;
    assert_eq!(relayed["Event"], "ITEM_ADDED");
    assert_eq!(relayed["Uid"], "o1");
    assert_eq!(relayed["Text"], "note");
    assert_eq!(relayed["Seq"], 1);
    assert!(rx_a.try_recv().is_err());
    assert!(state.coordinator.get_object("o1").await.unwrap().is_some());
}

#[tokio::test]
async fn rejected_and_malformed_frames_are_not_relayed() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path());
    let (a, _rx_a) = state.hub.register().await;
    let (_b, mut rx_b) = state.hub.register().await;

    handle_text(&state, a, "not json").await;
    handle_text(&state, a, &frame(json!({"Event": "NOPE", "Uid": "o1"}))).await;
    handle_text(&state, a, &frame(json!({"Event": "ITEM_REMOVED", "Uid": "missing"}))).await;
    handle_text(&state, a, &frame(json!({"Event": "SESSION_REMOVED", "Uid": "default"}))).await;
    // A File object cannot be added without an upload
    handle_text(
        &state,
        a,
        &frame(json!({
            "Event": "ITEM_ADDED",
            "Uid": "f1",
            "Session": "default",
            "ObjectType": "File",
            "Position": [0.0, 0.0, 0.0],
            "Scale": [1.0, 1.0, 1.0],
            "Rotation": [0.0, 0.0, 0.0, 1.0],
            "FileName": "a.bin"
        })),
    )
    .await;

    assert!(rx_b.try_recv().is_err());
    assert!(state.coordinator.get_session("default").await.unwrap().is_some());
}

#[tokio::test]
async fn last_holder_commits_its_own_move() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path());
    let (a, _rx_a) = state.hub.register().await;
    let (b, _rx_b) = state.hub.register().await;
    handle_text(&state, a, &added("o1")).await;

    handle_text(&state, a, &selection("o1", true)).await;
    handle_text(&state, b, &selection("o1", true)).await;
    handle_text(&state, a, &moved("o1", 1.0)).await;
    handle_text(&state, b, &moved("o1", 2.0)).await;
    assert_eq!(position(&state, "o1").await, [0.0, 0.0, 0.0]);

    // A leaves first: its buffered move is dropped
    handle_text(&state, a, &selection("o1", false)).await;
    assert_eq!(position(&state, "o1").await, [0.0, 0.0, 0.0]);

    handle_text(&state, b, &selection("o1", false)).await;
    assert_eq!(position(&state, "o1").await, [2.0, 0.0, 0.0]);
    assert!(!state.coordinator.is_selected("o1", None).await);
}

#[tokio::test]
async fn teardown_commits_held_moves_and_announces_them() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path());
    let (a, _rx_a) = state.hub.register().await;
    let (_b, mut rx_b) = state.hub.register().await;
    handle_text(&state, a, &added("o1")).await;
    handle_text(&state, a, &selection("o1", true)).await;
    handle_text(&state, a, &moved("o1", 3.0)).await;
    for _ in 0..3 {
        next(&mut rx_b).await;
    }

    teardown(&state, a).await;

    assert_eq!(state.hub.connection_count().await, 1);
    assert_eq!(position(&state, "o1").await, [3.0, 0.0, 0.0]);
    let announced = next(&mut rx_b).await;
    assert_eq!(announced["Event"], "ITEM_MOVED");
    assert_eq!(announced["Uid"], "o1");
    assert_eq!(announced["Position"], json!([3.0, 0.0, 0.0]));
    assert_eq!(announced["Seq"], 4);
    assert!(announced.get("Scale").is_none());
}

#[tokio::test]
async fn move_before_add_is_applied_on_arrival() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path());
    let (a, _rx_a) = state.hub.register().await;

    handle_text(&state, a, &moved("late", 5.0)).await;
    handle_text(&state, a, &added("late")).await;

    assert_eq!(position(&state, "late").await, [5.0, 0.0, 0.0]);
}

#[tokio::test]
async fn session_frames_drive_session_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path());
    let (a, _rx_a) = state.hub.register().await;
    let (_b, mut rx_b) = state.hub.register().await;

    handle_text(&state, a, &frame(json!({"Event": "SESSION_ADDED", "Uid": "s1", "Name": "Room"}))).await;
    assert_eq!(next(&mut rx_b).await["Event"], "SESSION_ADDED");
    assert_eq!(state.coordinator.list_session_uids(&[]).await.unwrap(), vec!["default", "s1"]);

    handle_text(&state, a, &frame(json!({"Event": "SESSION_REMOVED", "Uid": "s1"}))).await;
    let removed = next(&mut rx_b).await;
    assert_eq!(removed["Event"], "SESSION_REMOVED");
    assert_eq!(removed["Seq"], 2);
    assert!(state.coordinator.get_session("s1").await.unwrap().is_none());
}
