// Integration tests for the streaming WebSocket transport
//
// The router is served on an ephemeral port and driven with a real
// WebSocket client; the recognizer is the scripted test double.

mod common;

use anyhow::Result;
use common::{Script, ScriptedRecognizer};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use voice_journal::auth::StaticTokenVerifier;
use voice_journal::journal::{InMemoryJournalStore, JournalStore};
use voice_journal::recognition::RecognitionEvent;
use voice_journal::session::ClientEvent;
use voice_journal::{create_router, AppState};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(state: AppState) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

async fn connect(addr: SocketAddr) -> Result<Socket> {
    let (socket, _) = connect_async(format!("ws://{}/ws/transcribe", addr)).await?;
    Ok(socket)
}

async fn send_control(socket: &mut Socket, control: &str) -> Result<()> {
    socket.send(Message::Text(control.to_string())).await?;
    Ok(())
}

/// Next server event, skipping non-text frames
async fn next_event(socket: &mut Socket) -> Result<ClientEvent> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("socket closed"))??;
        if let Message::Text(text) = frame {
            return Ok(serde_json::from_str(&text)?);
        }
    }
}

/// Poll an async condition until it holds, failing after two seconds
async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached within 2s");
}

#[tokio::test]
async fn test_start_audio_end_relays_and_saves() -> Result<()> {
    let recognizer = ScriptedRecognizer::new(Script {
        on_close: vec![RecognitionEvent::final_result("today")],
        ..Script::responding(vec![RecognitionEvent::final_result("dear diary")])
    });
    let journal = Arc::new(InMemoryJournalStore::new());
    let state = AppState::new(Arc::new(recognizer.clone())).with_journal(journal.clone());
    let registry = state.registry.clone();
    let addr = serve(state).await?;

    let mut socket = connect(addr).await?;
    send_control(&mut socket, r#"{"type":"start"}"#).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Started { .. }));

    for chunk in [vec![1u8; 32], vec![2u8; 32], vec![3u8; 32]] {
        socket.send(Message::Binary(chunk)).await?;
    }
    send_control(&mut socket, r#"{"type":"end"}"#).await?;

    assert_eq!(
        next_event(&mut socket).await?,
        ClientEvent::Transcript {
            transcript: "dear diary".to_string(),
            is_final: true,
        }
    );
    assert_eq!(
        next_event(&mut socket).await?,
        ClientEvent::Transcript {
            transcript: "today".to_string(),
            is_final: true,
        }
    );
    match next_event(&mut socket).await? {
        ClientEvent::Closed { transcript, .. } => assert_eq!(transcript, "dear diary today"),
        other => panic!("expected closed, got {:?}", other),
    }

    assert_eq!(
        recognizer.written(),
        vec![vec![1u8; 32], vec![2u8; 32], vec![3u8; 32]]
    );
    assert_eq!(recognizer.closes(), 1);
    assert!(registry.is_empty().await);

    eventually(|| {
        let journal = journal.clone();
        async move { !journal.list_entries().await.unwrap_or_default().is_empty() }
    })
    .await;
    let entries = journal.list_entries().await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].transcript, "dear diary today");
    Ok(())
}

#[tokio::test]
async fn test_audio_before_start_is_a_recoverable_error() -> Result<()> {
    let recognizer = ScriptedRecognizer::new(Script::default());
    let addr = serve(AppState::new(Arc::new(recognizer.clone()))).await?;

    let mut socket = connect(addr).await?;
    socket.send(Message::Binary(vec![0; 16])).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Error { .. }));

    send_control(&mut socket, r#"{"type":"end"}"#).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Error { .. }));

    // The connection is still usable
    send_control(&mut socket, r#"{"type":"start","sample_rate":16000}"#).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Started { .. }));

    send_control(&mut socket, r#"{"type":"end"}"#).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Closed { .. }));
    assert_eq!(recognizer.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_control_and_duplicate_start() -> Result<()> {
    let recognizer = ScriptedRecognizer::new(Script::default());
    let addr = serve(AppState::new(Arc::new(recognizer.clone()))).await?;

    let mut socket = connect(addr).await?;
    send_control(&mut socket, r#"{"type":"pause"}"#).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Error { .. }));

    send_control(&mut socket, r#"{"type":"start"}"#).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Started { .. }));
    send_control(&mut socket, r#"{"type":"start"}"#).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Error { .. }));

    send_control(&mut socket, r#"{"type":"end"}"#).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Closed { .. }));
    assert_eq!(recognizer.opens(), 1);
    Ok(())
}

#[tokio::test]
async fn test_socket_close_stops_session() -> Result<()> {
    let recognizer = ScriptedRecognizer::new(Script::default());
    let journal = Arc::new(InMemoryJournalStore::new());
    let state = AppState::new(Arc::new(recognizer.clone())).with_journal(journal.clone());
    let registry = state.registry.clone();
    let addr = serve(state).await?;

    let mut socket = connect(addr).await?;
    send_control(&mut socket, r#"{"type":"start"}"#).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Started { .. }));
    socket.send(Message::Binary(vec![5; 16])).await?;

    let written = recognizer.clone();
    eventually(|| {
        let written = written.clone();
        async move { written.write_count() == 1 }
    })
    .await;
    assert_eq!(registry.len().await, 1);

    socket.close(None).await?;

    eventually(|| {
        let registry = registry.clone();
        async move { registry.is_empty().await }
    })
    .await;
    let closed = recognizer.clone();
    eventually(|| {
        let closed = closed.clone();
        async move { closed.closes() == 1 }
    })
    .await;

    // A disconnected session is never saved
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(journal.list_entries().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_upgrade_requires_valid_token() -> Result<()> {
    let state = AppState::new(Arc::new(ScriptedRecognizer::new(Script::default())))
        .with_verifier(Arc::new(StaticTokenVerifier::new(["secret".to_string()])));
    let addr = serve(state).await?;

    let rejected = connect_async(format!("ws://{}/ws/transcribe?token=wrong", addr)).await;
    match rejected {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
        Err(other) => panic!("expected HTTP 401, got {}", other),
        Ok(_) => panic!("upgrade accepted with a bad token"),
    }

    let (mut socket, _) = connect_async(format!("ws://{}/ws/transcribe?token=secret", addr)).await?;
    send_control(&mut socket, r#"{"type":"start"}"#).await?;
    assert!(matches!(next_event(&mut socket).await?, ClientEvent::Started { .. }));
    Ok(())
}
