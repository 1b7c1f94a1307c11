//! End-to-end relay tests: fake HTTP camera → relay → WebSocket clients

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use mjpeg_relay::{ReaderState, RelayConfig, RelayHandle, RelayService, ServerConfig};

fn jpeg(fill: u8, len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend(std::iter::repeat(fill).take(len));
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

/// Serve a multipart MJPEG response; frames are written once `go` fires
async fn fake_camera(status: &'static str, frames: Vec<Vec<u8>>, go: Arc<Notify>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            let frames = frames.clone();
            let go = Arc::clone(&go);

            tokio::spawn(async move {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;

                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Type: multipart/x-mixed-replace; boundary=frame\r\nConnection: close\r\n\r\n",
                    status
                );
                if socket.write_all(head.as_bytes()).await.is_err() || !status.starts_with("200") {
                    return;
                }

                go.notified().await;
                for frame in &frames {
                    let part = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
                    if socket.write_all(part).await.is_err()
                        || socket.write_all(frame).await.is_err()
                        || socket.write_all(b"\r\n").await.is_err()
                    {
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }

                // Keep the stream open like a live camera
                std::future::pending::<()>().await;
            });
        }
    });

    addr
}

async fn start_relay(camera: SocketAddr) -> RelayHandle {
    let config = RelayConfig::with_url(format!("http://{}/stream", camera))
        .frame_interval(Duration::ZERO)
        .stats_interval(Duration::ZERO);
    let server_config = ServerConfig::default().bind("127.0.0.1:0".parse().unwrap());

    RelayService::new(config, server_config)
        .start()
        .await
        .unwrap()
}

async fn wait_for_subscribers(relay: &RelayHandle, count: usize) {
    for _ in 0..200 {
        if relay.registry().len().await == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} subscribers", count);
}

async fn next_binary<S>(client: &mut S) -> Vec<u8>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let message = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for frame")
        .unwrap()
        .unwrap();
    match message {
        Message::Binary(data) => data.to_vec(),
        other => panic!("unexpected message: {:?}", other),
    }
}

#[tokio::test]
async fn test_frames_reach_every_subscriber() {
    let first = jpeg(0x11, 2048);
    let second = jpeg(0x22, 4096);
    let go = Arc::new(Notify::new());
    let camera = fake_camera("200 OK", vec![first.clone(), second.clone()], Arc::clone(&go)).await;

    let relay = start_relay(camera).await;
    let mut state = relay.subscribe_state();
    state
        .wait_for(|s| *s == ReaderState::Streaming)
        .await
        .unwrap();

    let url = format!("ws://{}", relay.local_addr());
    let (mut a, _) = connect_async(url.as_str()).await.unwrap();
    let (mut b, _) = connect_async(url.as_str()).await.unwrap();
    wait_for_subscribers(&relay, 2).await;

    go.notify_one();

    assert_eq!(next_binary(&mut a).await, first);
    assert_eq!(next_binary(&mut b).await, first);
    assert_eq!(next_binary(&mut a).await, second);
    assert_eq!(next_binary(&mut b).await, second);

    // Delivery is counted after the last queue accepts the frame
    for _ in 0..200 {
        if relay.stats().frames_delivered == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let stats = relay.stats();
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.frames_admitted, 2);
    assert_eq!(stats.frames_delivered, 4);

    relay.stop().await;
}

#[tokio::test]
async fn test_error_status_counts_as_failure() {
    let go = Arc::new(Notify::new());
    let camera = fake_camera("503 Service Unavailable", vec![], go).await;

    let relay = start_relay(camera).await;
    let mut state = relay.subscribe_state();
    state
        .wait_for(|s| *s == ReaderState::Failed)
        .await
        .unwrap();

    let stats = relay.stats();
    assert_eq!(stats.sessions, 0);
    assert_eq!(stats.failures, 1);

    relay.stop().await;
}

#[tokio::test]
async fn test_stop_disconnects_subscribers() {
    let go = Arc::new(Notify::new());
    let camera = fake_camera("200 OK", vec![], go).await;

    let relay = start_relay(camera).await;
    let (mut client, _) = connect_async(format!("ws://{}", relay.local_addr()))
        .await
        .unwrap();
    wait_for_subscribers(&relay, 1).await;

    let registry = Arc::clone(relay.registry());
    relay.stop().await;
    assert!(registry.is_empty().await);

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}
