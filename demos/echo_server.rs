//! WebSocket echo server demo.
//!
//! Run with: cargo run --example echo_server
//! Then connect with any WebSocket client, e.g. a browser console:
//!   new WebSocket("ws://127.0.0.1:9001").onmessage = e => console.log(e.data)

use std::error::Error;

use wavesock::{ServerConfig, ServerEvent, WsServer};

const ADDR: &str = "127.0.0.1:9001";

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
    println!("WebSocket echo server listening on {ADDR}");

    while let Some(event) = events.recv().await {
        match event {
            ServerEvent::Opened { session, peer } => {
                println!("{session} opened from {peer}");
            }
            ServerEvent::Data { session, message } => {
                if let Some(text) = message.as_text() {
                    println!("{session}: {text}");
                    server.send(session, text).await;
                }
            }
            ServerEvent::Error { session, error } => {
                eprintln!("error on {session:?}: {error}");
            }
            ServerEvent::Closed { session: Some(session) } => {
                println!("{session} closed");
            }
            ServerEvent::Closed { session: None } => break,
            _ => {}
        }
    }

    Ok(())
}
