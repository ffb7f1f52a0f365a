//! Shared fixtures for unit tests

use crate::collaborators::Collaborators;
use crate::connection::Outbound;
use crate::handlers::{ClientState, DispatchOutcome, Dispatcher};
use crate::protocol::{Envelope, EnvelopeKind};
use crate::server::GatewayState;
use livechat_common::AppConfig;
use livechat_core::UserId;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;

pub(crate) const SECRET: &str = "unit-test-secret";

pub(crate) fn config() -> AppConfig {
    let mut config = AppConfig::for_testing(SECRET);
    config.realtime.collaborator_timeout_secs = 1;
    config
}

pub(crate) fn state() -> GatewayState {
    GatewayState::new(config())
}

pub(crate) fn state_with(collaborators: Collaborators) -> GatewayState {
    GatewayState::with_collaborators(config(), collaborators)
}

pub(crate) fn user(name: &str) -> UserId {
    UserId::parse(name).unwrap()
}

/// One simulated client socket
pub(crate) struct TestClient {
    pub dispatcher: Dispatcher,
    pub client: ClientState,
    pub rx: mpsc::Receiver<Outbound>,
}

impl TestClient {
    pub fn new(state: &GatewayState) -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            dispatcher: Dispatcher::new(state.clone()),
            client: ClientState::new(tx),
            rx,
        }
    }

    /// Connect and authenticate, discarding `auth_success`
    pub async fn authed(state: &GatewayState, name: &str, session: Option<&str>) -> Self {
        let mut client = Self::new(state);
        let outcome = client.auth(name, session);
        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(client.next().await.kind(), EnvelopeKind::AuthSuccess);
        client
    }

    pub fn token(&self, name: &str) -> String {
        self.dispatcher
            .state()
            .jwt()
            .issue_token(&user(name))
            .unwrap()
    }

    pub fn auth(&mut self, name: &str, session: Option<&str>) -> DispatchOutcome {
        let mut data = json!({ "token": self.token(name) });
        if let Some(session) = session {
            data["session_id"] = json!(session);
        }
        self.send("auth", data)
    }

    pub fn send(&mut self, kind: &str, data: Value) -> DispatchOutcome {
        self.send_with(kind, data, None)
    }

    pub fn send_with(&mut self, kind: &str, data: Value, correlation: Option<&str>) -> DispatchOutcome {
        let mut frame = json!({ "type": kind, "data": data });
        if let Some(correlation) = correlation {
            frame["correlation_id"] = json!(correlation);
        }
        self.dispatcher.dispatch_text(&mut self.client, &frame.to_string())
    }

    /// Next outbound envelope, failing the test after a few seconds
    pub async fn next(&mut self) -> Envelope {
        match tokio::time::timeout(Duration::from_secs(5), self.rx.recv()).await {
            Ok(Some(Outbound::Envelope(env))) => env,
            Ok(Some(Outbound::Close(code))) => panic!("unexpected close {code}"),
            Ok(None) => panic!("writer channel closed"),
            Err(_) => panic!("no envelope received"),
        }
    }

    /// Next envelope of the given kind, skipping others
    pub async fn next_of(&mut self, kind: EnvelopeKind) -> Envelope {
        loop {
            let env = self.next().await;
            if env.kind() == kind {
                return env;
            }
        }
    }

    /// Everything already buffered
    pub fn drain(&mut self) -> Vec<Outbound> {
        std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
    }

    pub fn drain_envelopes(&mut self) -> Vec<Envelope> {
        self.drain()
            .into_iter()
            .filter_map(|out| match out {
                Outbound::Envelope(env) => Some(env),
                Outbound::Close(_) => None,
            })
            .collect()
    }
}
