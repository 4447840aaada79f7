//! End-to-end tests: a real listener on an ephemeral port driven by real
//! dialers over loopback WebSocket connections.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use wirelink_client::Dialer;
use wirelink_core::{Message, RetryPolicy, SessionError};
use wirelink_runtime::{Harness, Role};
use wirelink_server::Listener;
use wirelink_session::{ConnectionState, Recv};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Start a listener on an ephemeral port and wait for it to bind.
async fn start_listener() -> (Arc<Listener>, String) {
    let listener = Arc::new(Listener::new("127.0.0.1", 0));
    let background = Arc::clone(&listener);
    tokio::spawn(async move {
        let _ = background.start().await;
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    let addr = loop {
        if let Some(addr) = listener.local_addr() {
            break addr;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "listener never bound"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    (listener, format!("ws://{addr}"))
}

fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(50))
}

#[tokio::test]
async fn test_default_handler_end_to_end() {
    let (listener, url) = start_listener().await;

    let dialer = Dialer::new(url, quick_retry());
    dialer.start().await;
    assert_eq!(dialer.state().await, ConnectionState::Connected);

    dialer.send(Message::text("hello"), None).await;
    let reply = dialer.receive(Some(RECV_TIMEOUT)).await.into_message();
    assert_eq!(reply, Some(Message::text(r#"{"processed":"HELLO"}"#)));

    dialer.stop().await;
    listener.stop().await;
}

#[tokio::test]
async fn test_handler_swap_affects_only_later_messages() {
    let (listener, url) = start_listener().await;

    let dialer = Dialer::new(url, quick_retry());
    dialer.start().await;

    // First message goes through the default handler.
    dialer.send(Message::text("abc"), None).await;
    let reply = dialer.receive(Some(RECV_TIMEOUT)).await.into_message();
    assert_eq!(reply, Some(Message::text(r#"{"processed":"ABC"}"#)));

    let custom = |msg: &Message| {
        let reversed: String = msg.to_text_lossy().chars().rev().collect();
        Ok::<_, SessionError>(Message::Text(
            serde_json::json!({ "custom_processed": reversed }).to_string(),
        ))
    };
    listener.set_handler(Arc::new(custom));

    dialer.send(Message::text("stray"), None).await;
    let reply = dialer.receive(Some(RECV_TIMEOUT)).await.into_message();
    assert_eq!(
        reply,
        Some(Message::text(r#"{"custom_processed":"yarts"}"#))
    );

    dialer.stop().await;
    listener.stop().await;
}

#[tokio::test]
async fn test_retry_exhaustion_counts_attempts() {
    // An acceptor that drops every connection before the WebSocket
    // handshake completes, counting the attempts it saw.
    let tcp = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    tokio::spawn(async move {
        while let Ok((stream, _)) = tcp.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let dialer = Dialer::new(format!("ws://{addr}"), RetryPolicy::new(3, Duration::ZERO));
    dialer.start().await;

    assert_eq!(dialer.state().await, ConnectionState::Disconnected);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_concurrent_clients_each_get_their_own_session() {
    let (listener, url) = start_listener().await;

    let first = Dialer::new(url.clone(), quick_retry());
    let second = Dialer::new(url, quick_retry());
    first.start().await;
    second.start().await;
    assert_eq!(listener.connection_count().await, 2);

    first.send(Message::text("one"), None).await;
    second.send(Message::text("two"), None).await;

    let reply_one = first.receive(Some(RECV_TIMEOUT)).await.into_message();
    let reply_two = second.receive(Some(RECV_TIMEOUT)).await.into_message();
    assert_eq!(reply_one, Some(Message::text(r#"{"processed":"ONE"}"#)));
    assert_eq!(reply_two, Some(Message::text(r#"{"processed":"TWO"}"#)));

    first.stop().await;
    second.stop().await;
    listener.stop().await;
}

#[tokio::test]
async fn test_listener_stop_closes_connected_dialers() {
    let (listener, url) = start_listener().await;

    let dialer = Dialer::new(url, quick_retry());
    dialer.start().await;
    assert_eq!(dialer.state().await, ConnectionState::Connected);

    listener.stop().await;

    let recv = dialer.receive(Some(RECV_TIMEOUT)).await;
    assert!(matches!(recv, Recv::Closed | Recv::Failed(_)));
    assert_eq!(dialer.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_lazy_pull_drains_then_terminates() {
    let (listener, url) = start_listener().await;

    let dialer = Dialer::new(url, quick_retry());
    dialer.start().await;

    dialer.send(Message::text("first"), None).await;
    assert_eq!(
        dialer.next_message().await,
        Some(Message::text(r#"{"processed":"FIRST"}"#))
    );

    // Nothing further inbound: the pull times out and yields None.
    assert_eq!(dialer.next_message().await, None);

    dialer.stop().await;
    // Once disconnected the sequence terminates immediately.
    assert_eq!(dialer.next_message().await, None);

    listener.stop().await;
}

#[tokio::test]
async fn test_harness_owns_listener_lifecycle() {
    let listener = Arc::new(Listener::new("127.0.0.1", 0));

    let mut harness = Harness::new();
    harness.register(Arc::clone(&listener) as Arc<dyn Role>);
    let harness = Arc::new(harness);

    let running = {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move { harness.run().await })
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    let addr = loop {
        if let Some(addr) = listener.local_addr() {
            break addr;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "listener never bound"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    let dialer = Dialer::new(format!("ws://{addr}"), quick_retry());
    dialer.start().await;
    dialer.send(Message::text("hi"), None).await;
    let reply = dialer.receive(Some(RECV_TIMEOUT)).await.into_message();
    assert_eq!(reply, Some(Message::text(r#"{"processed":"HI"}"#)));

    harness.trigger_shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("harness did not stop")
        .expect("harness task panicked");
    assert!(result.is_ok());

    dialer.stop().await;
}
