//! Scripted transport used by the unit tests of this crate.

use async_trait::async_trait;
use serde_json::Value;
use std::{collections::VecDeque, sync::Mutex};

use crate::{
    error::{MontageError, MontageResult},
    transport::{Method, RequestArgs, Transport},
};

/// A request as seen by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub method: Method,
    pub path: String,
    pub args: RequestArgs,
}

/// Replays queued responses in order and records every request.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<MontageResult<Value>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, body: Value) -> Self {
        self.responses.lock().unwrap().push_back(Ok(body));
        self
    }

    pub fn fail(self, error: MontageError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, method: Method, path: &str, args: RequestArgs) -> MontageResult<Value> {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            args,
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MontageError::service(None, "no scripted response left")))
    }
}
