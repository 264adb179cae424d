//! WebSocket broadcast demo: every received message is fanned out to all
//! connected clients.
//!
//! Run with: cargo run --example broadcast_server

use std::error::Error;

use wavesock::{ServerConfig, ServerEvent, WsServer};

const ADDR: &str = "127.0.0.1:9002";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wavesock=debug".into()),
        )
        .init();

    let (server, mut events) = WsServer::new(ServerConfig::default());
    server.start(ADDR.parse()?, None).await?;
    println!("WebSocket broadcast server listening on {ADDR}");

    while let Some(event) = events.recv().await {
        match event {
            ServerEvent::Opened { session, peer } => {
                println!("{session} joined from {peer} ({} online)", server.session_count());
                server.broadcast(format!("{session} joined")).await;
            }
            ServerEvent::Data { session, message } => {
                if let Some(text) = message.as_text() {
                    server.broadcast(format!("{session}: {text}")).await;
                }
            }
            ServerEvent::Closed { session: Some(session) } => {
                server.broadcast(format!("{session} left")).await;
            }
            ServerEvent::Closed { session: None } => break,
            _ => {}
        }
    }

    Ok(())
}
