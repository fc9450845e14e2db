//! Fakes for the capability traits, shared by pipeline tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::channels::Notifier;
use crate::fulfillment::{FulfillmentExecutor, FulfillmentOutcome};

type CallHook = Box<dyn Fn(usize) + Send + Sync>;

/// Returns queued outcomes in order, then `fallback`. Records every target.
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<FulfillmentOutcome>>,
    fallback: FulfillmentOutcome,
    calls: Mutex<Vec<String>>,
    hook: Mutex<Option<CallHook>>,
}

impl ScriptedExecutor {
    pub fn new(script: Vec<FulfillmentOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: FulfillmentOutcome::Failure {
                reason: "no scripted outcome".to_string(),
            },
            calls: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
        }
    }

    pub fn always(outcome: FulfillmentOutcome) -> Self {
        Self {
            fallback: outcome,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Runs `hook` with the 1-based call number while each call is in flight.
    pub fn set_hook(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }
}

#[async_trait]
impl FulfillmentExecutor for ScriptedExecutor {
    async fn execute(&self, target_account_id: &str) -> FulfillmentOutcome {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(target_account_id.to_string());
            calls.len()
        };
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(call);
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub conversation_id: i64,
    pub anchor_message_id: i64,
    pub text: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the attempt but reports a delivery error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, conversation_id: i64, anchor_message_id: i64, text: &str) -> Result<(), String> {
        self.sent.lock().unwrap().push(SentNotification {
            conversation_id,
            anchor_message_id,
            text: text.to_string(),
        });
        if self.fail {
            Err("chat not found".to_string())
        } else {
            Ok(())
        }
    }
}
