use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use scene_sync::config::Config;
use scene_sync::db::{FileStore, MemoryEngine};
use scene_sync::models::EventKind;
use scene_sync::routes::create_ws_routes;
use scene_sync::AppState;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(root: &std::path::Path, config: &Config) -> (String, AppState) {
    let state = AppState::new(Arc::new(MemoryEngine::new(FileStore::new(root))), config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_ws_routes(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("ws://{addr}/ws"), state)
}

async fn wait_for_connections(state: &AppState, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.hub.connection_count().await != n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection count never settled");
}

async fn send(client: &mut Client, value: Value) {
    client.send(Message::text(value.to_string())).await.unwrap();
}

async fn receive(client: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("no frame received")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(_) = message {
            return serde_json::from_str(message.to_text().unwrap()).unwrap();
        }
    }
}

#[tokio::test]
async fn frames_flow_between_real_sockets() {
    let dir = tempfile::tempdir().unwrap();
    let (url, state) = serve(dir.path(), &Config::default()).await;

    let (mut a, _) = connect_async(url.as_str()).await.unwrap();
    let (mut b, _) = connect_async(url.as_str()).await.unwrap();
    wait_for_connections(&state, 2).await;

    send(
        &mut a,
        json!({
            "Event": "ITEM_ADDED",
            "Uid": "o1",
            "Session": "default",
            "ObjectType": "Text",
            "Position": [0.0, 0.0, 0.0],
            "Scale": [1.0, 1.0, 1.0],
            "Rotation": [0.0, 0.0, 0.0, 1.0],
            "Text": "hi"
        }),
    )
    .await;
    let added = receive(&mut b).await;
    assert_eq!(added["Event"], "ITEM_ADDED");
    assert_eq!(added["Seq"], 1);

    send(&mut a, json!({"Event": "ITEM_SELECTION_CHANGED", "Uid": "o1", "IsSelected": true})).await;
    assert_eq!(receive(&mut b).await["Seq"], 2);
    send(&mut a, json!({"Event": "ITEM_MOVED", "Uid": "o1", "Scale": [2.0, 2.0, 2.0]})).await;
    let moved = receive(&mut b).await;
    assert_eq!(moved["Event"], "ITEM_MOVED");
    assert_eq!(moved["Seq"], 3);

    // Dropping A releases its selection and commits the buffered move
    a.close(None).await.unwrap();
    drop(a);
    wait_for_connections(&state, 1).await;

    let committed = receive(&mut b).await;
    assert_eq!(committed["Event"], "ITEM_MOVED");
    assert_eq!(committed["Uid"], "o1");
    assert_eq!(committed["Scale"], json!([2.0, 2.0, 2.0]));
    assert_eq!(committed["Seq"], 4);

    let object = state.coordinator.get_object("o1").await.unwrap().unwrap();
    assert_eq!(object.scale, [2.0, 2.0, 2.0]);
    assert!(!state.coordinator.is_selected("o1", None).await);
}

#[tokio::test]
async fn client_that_stops_reading_is_torn_down() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        send_timeout_ms: 50,
        client_queue_capacity: 1,
        ..Config::default()
    };
    let (url, state) = serve(dir.path(), &config).await;
    let text = json!({
        "Uid": "o1",
        "Session": "default",
        "ObjectType": "Text",
        "Position": [0.0, 0.0, 0.0],
        "Scale": [1.0, 1.0, 1.0],
        "Rotation": [0.0, 0.0, 0.0, 1.0],
        "Text": "hi"
    });
    let Value::Object(data) = text else { unreachable!() };
    state.coordinator.add_object(&data, None).await.unwrap();

    let (mut a, _) = connect_async(url.as_str()).await.unwrap();
    wait_for_connections(&state, 1).await;
    send(&mut a, json!({"Event": "ITEM_SELECTION_CHANGED", "Uid": "o1", "IsSelected": true})).await;
    send(&mut a, json!({"Event": "ITEM_MOVED", "Uid": "o1", "Position": [4.0, 0.0, 0.0]})).await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.coordinator.selection_stats().await.pending != 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("move was never buffered");

    // A never reads, so large frames back up until the hub gives up on it
    let mut payload = Map::new();
    payload.insert("Uid".into(), json!("noise"));
    payload.insert("Blob".into(), Value::String("x".repeat(1 << 20)));
    for _ in 0..200 {
        state.hub.broadcast_event(EventKind::ItemRemoved, payload.clone(), None).await;
        if state.hub.connection_count().await == 0 {
            break;
        }
    }
    assert_eq!(state.hub.connection_count().await, 0);

    tokio::time::timeout(Duration::from_secs(5), async {
        while state.coordinator.is_selected("o1", None).await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("selection was never released");
    let object = state.coordinator.get_object("o1").await.unwrap().unwrap();
    assert_eq!(object.position, [4.0, 0.0, 0.0]);

    // Nothing A sends afterwards is applied
    let late = json!({"Event": "ITEM_SELECTION_CHANGED", "Uid": "o2", "IsSelected": true});
    let _ = tokio::time::timeout(Duration::from_secs(1), a.send(Message::text(late.to_string()))).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!state.coordinator.is_selected("o2", None).await);
}
