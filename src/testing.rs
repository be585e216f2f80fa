//! Scripted collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::approval::{ApprovalGate, PendingAction};
use crate::error::ToolError;
use crate::message::Message;
use crate::provider::Chat;
use crate::tools::Tool;

enum Behavior {
    Reply(String),
    Fail(String),
    Cancel,
    Hang,
}

/// Tool that records every argument map it is invoked with.
pub struct RecordingTool {
    name: String,
    behavior: Behavior,
    calls: Mutex<Vec<Map<String, Value>>>,
}

impl RecordingTool {
    fn with(name: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(name: &str, reply: &str) -> Arc<Self> {
        Self::with(name, Behavior::Reply(reply.to_string()))
    }

    pub fn failing(name: &str, message: &str) -> Arc<Self> {
        Self::with(name, Behavior::Fail(message.to_string()))
    }

    /// Reports cancellation as soon as it runs.
    pub fn cancelling(name: &str) -> Arc<Self> {
        Self::with(name, Behavior::Cancel)
    }

    /// Never finishes on its own.
    pub fn hanging(name: &str) -> Arc<Self> {
        Self::with(name, Behavior::Hang)
    }

    pub fn calls(&self) -> Vec<Map<String, Value>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "test tool"
    }

    fn usage(&self) -> &str {
        "test_tool({})"
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        _cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push(args);
        match &self.behavior {
            Behavior::Reply(reply) => Ok(reply.clone()),
            Behavior::Fail(message) => Err(anyhow::anyhow!("{message}").into()),
            Behavior::Cancel => Err(ToolError::Cancelled),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

/// Gate with a fixed answer that records what it was shown.
pub struct FixedGate {
    approve: bool,
    requests: Mutex<Vec<PendingAction>>,
}

impl FixedGate {
    pub fn approving() -> Self {
        Self {
            approve: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn denying() -> Self {
        Self {
            approve: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PendingAction> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ApprovalGate for FixedGate {
    async fn request(&self, action: &PendingAction) -> bool {
        self.requests.lock().unwrap().push(action.clone());
        self.approve
    }
}

/// Gate that takes its time: either it never answers, or it blocks a pool
/// thread the way a terminal read does and then approves.
pub struct SlowGate {
    block_for: Option<Duration>,
    requests: Mutex<usize>,
}

impl SlowGate {
    pub fn never() -> Self {
        Self {
            block_for: None,
            requests: Mutex::new(0),
        }
    }

    pub fn blocking_for(duration: Duration) -> Self {
        Self {
            block_for: Some(duration),
            requests: Mutex::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        *self.requests.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl ApprovalGate for SlowGate {
    async fn request(&self, _action: &PendingAction) -> bool {
        *self.requests.lock().unwrap() += 1;
        match self.block_for {
            Some(duration) => tokio::task::spawn_blocking(move || std::thread::sleep(duration))
                .await
                .is_ok(),
            None => std::future::pending().await,
        }
    }
}

/// Cancels `token` after `millis` milliseconds.
pub fn cancel_after(token: &CancellationToken, millis: u64) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        token.cancel();
    });
}

/// Chat backend that replays canned responses and records each history it sees.
///
/// Once the script runs out it keeps returning the last response.
pub struct ScriptedChat {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    histories: Mutex<Vec<Vec<Message>>>,
    cancel_on_call: Option<(usize, CancellationToken)>,
    fail: bool,
}

impl ScriptedChat {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            last: Mutex::new(String::new()),
            histories: Mutex::new(Vec::new()),
            cancel_on_call: None,
            fail: false,
        }
    }

    /// Cancels `token` during call number `call` (1-based) and then hangs.
    pub fn cancelling_on(mut self, call: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    /// Raises instead of answering.
    pub fn failing() -> Self {
        let mut chat = Self::new(Vec::<String>::new());
        chat.fail = true;
        chat
    }

    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.histories.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.histories.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Chat for ScriptedChat {
    async fn chat(
        &self,
        history: &[Message],
        _system_prompt: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<String> {
        let call = {
            let mut histories = self.histories.lock().unwrap();
            histories.push(history.to_vec());
            histories.len()
        };
        if self.fail {
            anyhow::bail!("backend exploded");
        }
        if let Some((at, ref token)) = self.cancel_on_call {
            if at == call {
                token.cancel();
                std::future::pending::<()>().await;
            }
        }

        let next = self.responses.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(next) = next {
            *last = next;
        }
        Ok(last.clone())
    }
}
