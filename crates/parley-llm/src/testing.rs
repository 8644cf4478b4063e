//! Scripted provider for exercising session and orchestration code without a
//! network. Same role as a live adapter: implements [`Provider`] and replays
//! pre-recorded event scripts, one per expected provider call.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::provider::{
    Completion, CompletionRequest, EventStream, Provider, ProviderEvent,
};

type Script = Vec<std::result::Result<ProviderEvent, String>>;

#[derive(Default)]
pub struct ScriptedProvider {
    streams: Mutex<VecDeque<Script>>,
    completions: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the event script for the next `stream` call.
    pub fn push_stream(&self, events: Vec<ProviderEvent>) {
        self.streams
            .lock()
            .unwrap()
            .push_back(events.into_iter().map(Ok).collect());
    }

    /// Queue a script that fails mid-stream with the given message.
    pub fn push_stream_with_error(&self, events: Vec<ProviderEvent>, error: &str) {
        let mut script: Script = events.into_iter().map(Ok).collect();
        script.push(Err(error.to_string()));
        self.streams.lock().unwrap().push_back(script);
    }

    /// Queue the text returned by the next `complete` call.
    pub fn push_completion(&self, content: &str) {
        self.completions
            .lock()
            .unwrap()
            .push_back(Ok(content.to_string()));
    }

    pub fn push_completion_error(&self, error: &str) {
        self.completions
            .lock()
            .unwrap()
            .push_back(Err(error.to_string()));
    }

    /// Requests seen so far, for asserting on payload shape.
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn models(&self) -> Result<Vec<String>> {
        Ok(vec!["scripted-mini".to_string(), "scripted-large".to_string()])
    }

    async fn stream(&self, request: CompletionRequest) -> Result<EventStream> {
        self.requests.lock().unwrap().push(request);

        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted stream left"))?;

        let items = script
            .into_iter()
            .map(|item| item.map_err(|e| anyhow::anyhow!(e)));
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        self.requests.lock().unwrap().push(request);

        match self.completions.lock().unwrap().pop_front() {
            Some(Ok(content)) => Ok(Completion {
                content: Some(content),
                usage: None,
            }),
            Some(Err(error)) => Err(anyhow::anyhow!(error)),
            None => Err(anyhow::anyhow!("no scripted completion left")),
        }
    }
}
