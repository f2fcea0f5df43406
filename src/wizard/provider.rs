//! Hosting provider choice and payment state for the final wizard step

use crate::config::ProviderCatalog;
use crate::notify::{Notice, Notifier};
use crate::{Error, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Unpaid,
    FreeTrial,
    Paid,
}

#[derive(Debug, Clone)]
pub struct ProviderSelection {
    catalog: ProviderCatalog,
    selected: String,
    price_usd: u32,
    payment: PaymentState,
}

impl ProviderSelection {
    /// Starts on the catalog's default provider, unpaid
    pub fn new(catalog: ProviderCatalog) -> Self {
        let selected = catalog.default_code.clone();
        let price_usd = catalog.price_for(&selected).unwrap_or_default();
        Self {
            catalog,
            selected,
            price_usd,
            payment: PaymentState::Unpaid,
        }
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn price_usd(&self) -> u32 {
        self.price_usd
    }

    pub fn payment(&self) -> PaymentState {
        self.payment
    }

    pub fn is_paid(&self) -> bool {
        self.payment != PaymentState::Unpaid
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn select(&mut self, code: &str) -> Result<()> {
        let price = self
            .catalog
            .price_for(code)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown provider: {}", code)))?;
        self.price_usd = match self.payment {
            PaymentState::FreeTrial => 0,
            PaymentState::Unpaid | PaymentState::Paid => price,
        };
        self.selected = code.to_string();
        tracing::debug!(provider = %code, price_usd = self.price_usd, "Provider selected");
        Ok(())
    }

    pub fn pay(&mut self, notifier: &dyn Notifier) {
        if self.is_paid() {
            return;
        }
        self.payment = PaymentState::Paid;
        tracing::info!(provider = %self.selected, price_usd = self.price_usd, "Plan paid");
        notifier.notify(Notice::success(
            "Payment Successful",
            format!(
                "You have successfully paid ${} for your selected plan.",
                self.price_usd
            ),
        ));
    }

    pub fn apply_free_trial(&mut self, notifier: &dyn Notifier) {
        if self.payment == PaymentState::FreeTrial {
            return;
        }
        self.payment = PaymentState::FreeTrial;
        self.price_usd = 0;
        tracing::info!(provider = %self.selected, "Free trial applied");
        notifier.notify(Notice::success(
            "Free Trial Applied",
            "You have successfully applied the free trial. Enjoy your agent!",
        ));
    }
}
