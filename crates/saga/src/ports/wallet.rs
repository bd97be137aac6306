//! Wallet port: reserve, confirm and release of user funds.
//!
//! The three operations are split into separate traits so each service
//! only sees the capability it actually uses: the reservation service
//! reserves, the settlement service confirms or releases.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::PaymentId;
use domain::Money;

use super::PortError;

/// Places a hold on user funds for a payment.
#[async_trait]
pub trait WalletReserver: Send + Sync {
    async fn reserve(
        &self,
        user_id: &str,
        amount: Money,
        payment_id: PaymentId,
    ) -> Result<(), PortError>;
}

/// Converts a hold into a captured charge after gateway success.
#[async_trait]
pub trait WalletConfirmer: Send + Sync {
    async fn confirm(
        &self,
        user_id: &str,
        amount: Money,
        payment_id: PaymentId,
    ) -> Result<(), PortError>;
}

/// Returns held funds to the user after gateway failure.
#[async_trait]
pub trait WalletReleaser: Send + Sync {
    async fn release(
        &self,
        user_id: &str,
        amount: Money,
        payment_id: PaymentId,
    ) -> Result<(), PortError>;
}

#[derive(Debug, Default)]
struct WalletState {
    reserved: HashMap<PaymentId, (String, Money)>,
    confirmed: Vec<(String, Money, PaymentId)>,
    released: Vec<(String, Money, PaymentId)>,
    reserve_calls: u32,
    confirm_calls: u32,
    release_calls: u32,
    fail_on_reserve: bool,
    fail_on_confirm: bool,
    fail_on_release: bool,
}

/// In-memory wallet implementing all three capabilities, for tests and
/// local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWallet {
    state: Arc<RwLock<WalletState>>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve = fail;
    }

    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.state.write().unwrap().fail_on_confirm = fail;
    }

    pub fn set_fail_on_release(&self, fail: bool) {
        self.state.write().unwrap().fail_on_release = fail;
    }

    pub fn reserve_calls(&self) -> u32 {
        self.state.read().unwrap().reserve_calls
    }

    pub fn confirm_calls(&self) -> u32 {
        self.state.read().unwrap().confirm_calls
    }

    pub fn release_calls(&self) -> u32 {
        self.state.read().unwrap().release_calls
    }

    pub fn has_reservation(&self, payment_id: PaymentId) -> bool {
        self.state.read().unwrap().reserved.contains_key(&payment_id)
    }

    pub fn released(&self) -> Vec<(String, Money, PaymentId)> {
        self.state.read().unwrap().released.clone()
    }

    pub fn confirmed(&self) -> Vec<(String, Money, PaymentId)> {
        self.state.read().unwrap().confirmed.clone()
    }
}

#[async_trait]
impl WalletReserver for InMemoryWallet {
    async fn reserve(
        &self,
        user_id: &str,
        amount: Money,
        payment_id: PaymentId,
    ) -> Result<(), PortError> {
        let mut state = self.state.write().unwrap();
        state.reserve_calls += 1;
        if state.fail_on_reserve {
            return Err(PortError::Rejected("insufficient funds".to_string()));
        }
        state
            .reserved
            .insert(payment_id, (user_id.to_string(), amount));
        Ok(())
    }
}

#[async_trait]
impl WalletConfirmer for InMemoryWallet {
    async fn confirm(
        &self,
        user_id: &str,
        amount: Money,
        payment_id: PaymentId,
    ) -> Result<(), PortError> {
        let mut state = self.state.write().unwrap();
        state.confirm_calls += 1;
        if state.fail_on_confirm {
            return Err(PortError::Unavailable("wallet unavailable".to_string()));
        }
        state.reserved.remove(&payment_id);
        state
            .confirmed
            .push((user_id.to_string(), amount, payment_id));
        Ok(())
    }
}

#[async_trait]
impl WalletReleaser for InMemoryWallet {
    async fn release(
        &self,
        user_id: &str,
        amount: Money,
        payment_id: PaymentId,
    ) -> Result<(), PortError> {
        let mut state = self.state.write().unwrap();
        state.release_calls += 1;
        if state.fail_on_release {
            return Err(PortError::Unavailable("wallet unavailable".to_string()));
        }
        state.reserved.remove(&payment_id);
        state
            .released
            .push((user_id.to_string(), amount, payment_id));
        Ok(())
    }
}
