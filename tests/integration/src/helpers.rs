//! Test helpers for integration tests
//!
//! Provides a self-contained test server and a small WebSocket client that
//! speaks the JSON envelope protocol.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use livechat_common::AppConfig;
use livechat_core::UserId;
use livechat_gateway::{create_app, GatewayState};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Signing secret shared by the server and the test token issuer
pub const TEST_SECRET: &str = "integration-test-secret";

/// How long a client waits for any single frame
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Default test configuration
pub fn test_config() -> AppConfig {
    AppConfig::for_testing(TEST_SECRET)
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: GatewayState,
    pub client: Client,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let state = GatewayState::new(config);
        let app = create_app(state.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            state,
            client,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Issue a valid token for `name`
    pub fn token(&self, name: &str) -> Result<String> {
        let user_id = UserId::parse(name)?;
        Ok(self.state.jwt().issue_token(&user_id)?)
    }

    /// Open a socket and consume the `hello` greeting
    pub async fn connect(&self) -> Result<WsClient> {
        let (stream, _) = connect_async(self.ws_url()).await?;
        let mut client = WsClient { stream };

        let hello = client.recv().await?;
        if kind(&hello) != "system" || hello["data"]["event"] != "hello" {
            bail!("Expected hello, got {hello}");
        }
        Ok(client)
    }

    /// Connect and authenticate, returning the client and its `auth_success` data
    pub async fn connect_as(&self, name: &str, session: Option<&str>) -> Result<(WsClient, Value)> {
        let mut client = self.connect().await?;
        client.auth(&self.token(name)?, session).await?;
        let success = client.recv_of("auth_success").await?;
        Ok((client, success["data"].clone()))
    }
}

/// Envelope `type`
pub fn kind(envelope: &Value) -> &str {
    envelope["type"].as_str().unwrap_or_default()
}

/// WebSocket client speaking JSON envelopes
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Send one envelope
    pub async fn send(&mut self, kind: &str, data: Value) -> Result<()> {
        let envelope = json!({ "type": kind, "data": data });
        self.send_raw(Message::Text(envelope.to_string())).await
    }

    pub async fn send_raw(&mut self, message: Message) -> Result<()> {
        self.stream.send(message).await?;
        Ok(())
    }

    pub async fn auth(&mut self, token: &str, session: Option<&str>) -> Result<()> {
        let mut data = json!({ "token": token });
        if let Some(session) = session {
            data["session_id"] = json!(session);
        }
        self.send("auth", data).await
    }

    /// Next envelope; fails on timeout or close
    pub async fn recv(&mut self) -> Result<Value> {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for a frame")?
                .ok_or_else(|| anyhow!("Stream ended"))??;

            match frame {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(frame) => bail!("Connection closed: {frame:?}"),
                _ => continue,
            }
        }
    }

    /// Skip envelopes until one of `kind` arrives
    pub async fn recv_of(&mut self, kind_name: &str) -> Result<Value> {
        loop {
            let envelope = self.recv().await?;
            if kind(&envelope) == kind_name {
                return Ok(envelope);
            }
        }
    }

    /// Everything received before the `pong` answering a fresh `ping`
    pub async fn until_pong(&mut self) -> Result<Vec<Value>> {
        self.send("ping", json!({})).await?;
        let mut seen = Vec::new();
        loop {
            let envelope = self.recv().await?;
            if kind(&envelope) == "pong" {
                return Ok(seen);
            }
            seen.push(envelope);
        }
    }

    /// Read until the server's close frame and return its code
    pub async fn expect_close(&mut self) -> Result<u16> {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for close")?;

            match frame {
                Some(Ok(Message::Close(Some(frame)))) => return Ok(u16::from(frame.code)),
                Some(Ok(Message::Close(None))) => bail!("Close frame without code"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => bail!("Stream error before close: {e}"),
                None => bail!("Stream ended without close frame"),
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
