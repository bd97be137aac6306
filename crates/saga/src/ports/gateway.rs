//! Payment gateway port.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::PaymentId;
use domain::Money;
use uuid::Uuid;

use super::PortError;

/// External payment processor. A successful charge yields an opaque
/// gateway reference that is recorded on the payment.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn process(&self, payment_id: PaymentId, amount: Money) -> Result<String, PortError>;
}

#[derive(Debug, Default)]
struct GatewayState {
    calls: Vec<(PaymentId, Money)>,
    reference: Option<String>,
    fail_on_process: bool,
}

/// In-memory gateway for tests and local runs. Returns a fixed reference
/// when one is configured, otherwise a fresh `gw_<uuid>`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reference(&self, reference: &str) {
        self.state.write().unwrap().reference = Some(reference.to_string());
    }

    pub fn set_fail_on_process(&self, fail: bool) {
        self.state.write().unwrap().fail_on_process = fail;
    }

    pub fn process_calls(&self) -> u32 {
        self.state.read().unwrap().calls.len() as u32
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn process(&self, payment_id: PaymentId, amount: Money) -> Result<String, PortError> {
        let mut state = self.state.write().unwrap();
        state.calls.push((payment_id, amount));
        if state.fail_on_process {
            return Err(PortError::Rejected("card declined".to_string()));
        }
        Ok(state
            .reference
            .clone()
            .unwrap_or_else(|| format!("gw_{}", Uuid::new_v4())))
    }
}
