use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Identifier for catalog products.
pub type ProductId = String;

/// Identifier for ledger transactions.
pub type TransactionId = String;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Sales unit shown on receipts ("pcs", "porsi", "kg").
    #[serde(default = "default_unit")]
    pub unit: String,
    pub selling_price: Decimal,
    /// Cost of goods per unit, once an HPP calculation has been applied.
    #[serde(default)]
    pub hpp: Option<Decimal>,
    #[serde(default)]
    pub stock: u32,
}

impl Product {
    /// Markup over HPP in percent. `None` until an HPP is known.
    pub fn margin_percent(&self) -> Option<Decimal> {
        let hpp = self.hpp.filter(|cost| *cost > Decimal::ZERO)?;
        (self.selling_price - hpp)
            .checked_div(hpp)
            .map(|ratio| ratio * Decimal::ONE_HUNDRED)
    }

    pub fn in_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}

fn default_unit() -> String {
    "pcs".to_string()
}

/// Form payload for creating a product; the catalog assigns the id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub selling_price: Decimal,
    #[serde(default)]
    pub hpp: Option<Decimal>,
    #[serde(default)]
    pub stock: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxSettings {
    pub enabled: bool,
    pub rate_percent: Decimal,
    pub label: String,
}

impl Default for TaxSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            rate_percent: Decimal::from(11),
            label: "PPN".to_string(),
        }
    }
}

impl TaxSettings {
    /// `None` when the amount leaves the `Decimal` range.
    pub fn tax_for(&self, subtotal: Decimal) -> Option<Decimal> {
        if !self.enabled {
            return Some(Decimal::ZERO);
        }
        subtotal
            .checked_mul(self.rate_percent)?
            .checked_div(Decimal::ONE_HUNDRED)
    }

    /// Returns `false` and leaves the rate untouched for negative input.
    pub fn set_rate(&mut self, rate_percent: Decimal) -> bool {
        if rate_percent < Decimal::ZERO {
            return false;
        }
        self.rate_percent = rate_percent;
        true
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Transfer,
    Qris,
}

impl PaymentMethod {
    pub fn name(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Tunai",
            PaymentMethod::Transfer => "Transfer",
            PaymentMethod::Qris => "QRIS",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    pub paid: Decimal,
    pub change: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub description: String,
    #[serde(default)]
    pub items: Vec<TransactionItem>,
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub cost_of_goods: Decimal,
    #[serde(default)]
    pub payment: Option<Payment>,
    /// Unix timestamp (seconds).
    pub recorded_at: i64,
}

impl Transaction {
    pub fn recorded_at_rfc3339(&self) -> Option<String> {
        OffsetDateTime::from_unix_timestamp(self.recorded_at)
            .ok()
            .and_then(|dt| dt.format(&Rfc3339).ok())
    }
}
