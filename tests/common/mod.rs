//! Shared fixtures: a scripted in-memory backend and canvas helpers

#![allow(dead_code)]

use async_trait::async_trait;
use canvas_wire::canvas::Surface;
use canvas_wire::core::config::RuntimeConfig;
use canvas_wire::core::error::{Result, WireError};
use canvas_wire::descriptor::FunctionalityDescriptor;
use canvas_wire::executor::Executor;
use canvas_wire::llm::{InferenceBackend, InferenceRequest, InferenceResponse};
use canvas_wire::pending::PendingOperationStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Notify};

enum Reply {
    Ok(InferenceResponse),
    Fail(String),
    /// Held until the gate sender fires or is dropped
    Gated(oneshot::Receiver<()>, InferenceResponse),
}

/// Backend answering from a queue of scripted replies, counting every call
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<InferenceRequest>>,
    calls: AtomicUsize,
    /// Signalled each time a call arrives
    pub called: Notify,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply_text(&self, text: &str) {
        self.push(Reply::Ok(InferenceResponse::text(text)));
    }

    pub fn reply(&self, response: InferenceResponse) {
        self.push(Reply::Ok(response));
    }

    pub fn fail(&self, reason: &str) {
        self.push(Reply::Fail(reason.to_string()));
    }

    /// Queue a reply that is held until the returned sender fires
    pub fn gated_text(&self, text: &str) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.push(Reply::Gated(gate, InferenceResponse::text(text)));
        release
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        self.called.notify_one();

        match reply {
            Some(Reply::Ok(response)) => Ok(response),
            Some(Reply::Fail(reason)) => Err(WireError::RemoteCall(reason)),
            Some(Reply::Gated(gate, response)) => {
                let _ = gate.await;
                Ok(response)
            }
            None => Err(WireError::RemoteCall("no scripted reply".into())),
        }
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn executor(backend: &Arc<ScriptedBackend>, surface: &Surface, store: &PendingOperationStore) -> Executor {
    let backend: Arc<dyn InferenceBackend> = backend.clone();
    Executor::new(backend, store.clone(), surface.clone(), RuntimeConfig::default())
}

pub fn descriptor(inputs: &[&str], output: &str, trigger: &str) -> FunctionalityDescriptor {
    FunctionalityDescriptor {
        id: "fn-1".into(),
        name: "test functionality".into(),
        system_prompt: "Summarize the input".into(),
        input_ids: strings(inputs),
        output_id: Some(output.to_string()),
        trigger_id: Some(trigger.to_string()),
        ..Default::default()
    }
}
