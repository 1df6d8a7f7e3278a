use super::*;
use std::collections::VecDeque;
use tokio::sync::{Mutex, Semaphore};

/// Gateway that replays canned responses in order and records every request.
///
/// Used to drive the game without network access. A gated instance holds each
/// call until [`ScriptedGateway::release`] is called.
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<GatewayResponse>>,
    requests: Mutex<Vec<GatewayRequest>>,
    gate: Option<Semaphore>,
}

impl ScriptedGateway {
    pub fn new(responses: Vec<GatewayResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Like `new`, but every call waits for a `release`
    pub fn gated(responses: Vec<GatewayResponse>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(responses)
        }
    }

    /// Queue another response
    pub async fn push(&self, response: GatewayResponse) {
        self.responses.lock().await.push_back(response);
    }

    /// Let `n` held calls proceed
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Number of calls received so far, including held ones
    pub async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ContentGateway for ScriptedGateway {
    async fn generate(&self, request: GatewayRequest) -> GatewayResponse {
        self.requests.lock().await.push(request);

        if let Some(gate) = &self.gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return GatewayResponse::failed("gateway closed"),
            }
        }

        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| GatewayResponse::failed("no scripted response"))
    }
}
