//! Completion client that "translates" by prefixing every string it is sent.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use bgtranslate::ai::{AiError, CompletionClient};
use bgtranslate::JobRepository;

pub const PREFIX: &str = "TR:";

/// Scripted answer for a given call number (1-based).
#[derive(Debug, Clone)]
pub enum Reply {
    /// Translate normally.
    Translate,
    /// Answer with text that is not JSON.
    Malformed,
    /// Fail with an HTTP status.
    Status(u16),
}

#[derive(Default)]
pub struct FakeAi {
    calls: AtomicUsize,
    script: Mutex<HashMap<usize, Reply>>,
    payloads: Mutex<Vec<Value>>,
    cancel_on: Mutex<Option<(usize, JobRepository, String)>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_on(&self, call: usize, reply: Reply) {
        self.script.lock().unwrap().insert(call, reply);
    }

    /// Flags the job `cancelled` while call number `call` is in flight.
    pub fn cancel_on(&self, call: usize, repo: JobRepository, job_id: &str) {
        *self.cancel_on.lock().unwrap() = Some((call, repo, job_id.to_string()));
    }

    pub fn delay_each_call(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User payloads received, in order.
    pub fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().unwrap().clone()
    }

    /// Keys (flat payloads) or record count (array payloads) per call.
    pub fn flat_keys(&self) -> Vec<String> {
        self.payloads()
            .iter()
            .filter_map(Value::as_object)
            .flat_map(|map| map.keys().cloned().collect::<Vec<_>>())
            .collect()
    }
}

fn translate(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(format!("{}{}", PREFIX, s)),
        Value::Array(items) => Value::Array(items.iter().map(translate).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), translate(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[async_trait]
impl CompletionClient for FakeAi {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, AiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let payload: Value = serde_json::from_str(user).expect("payload is JSON");
        self.payloads.lock().unwrap().push(payload.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let cancel = self
            .cancel_on
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(on, _, _)| *on == call)
            .map(|(_, repo, id)| (repo.clone(), id.clone()));
        if let Some((repo, id)) = cancel {
            repo.cancel(&id).await.expect("cancel job");
        }

        let reply = self
            .script
            .lock()
            .unwrap()
            .get(&call)
            .cloned()
            .unwrap_or(Reply::Translate);
        match reply {
            Reply::Translate => Ok(format!("```json\n{}\n```", translate(&payload))),
            Reply::Malformed => Ok("I'm sorry, here is your translation: Bonjour".to_string()),
            Reply::Status(status) => Err(AiError::status(status, "scripted failure")),
        }
    }
}
