//! Test harness utilities for exercising the server over real sockets.

mod client;

pub use client::TestClient;
