use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::{Catalog, CatalogError};
use super::checkout::{checkout, Cart, CheckoutError, PaymentRequest};
use super::entities::{Product, TaxSettings, Transaction};
use super::hpp::{
    compute_unit_cost, CostCalculationError, CostCalculationInput, CostCalculationResult,
};
use super::ledger::Ledger;

/// Margin prefilled in the HPP form when the merchant has not picked one.
pub const DEFAULT_MARGIN_PERCENT: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

#[derive(Clone, Debug)]
pub struct AppState {
    pub catalog: Catalog,
    pub ledger: Ledger,
    pub cart: Cart,
    pub tax: TaxSettings,
    pub default_margin_percent: Decimal,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            catalog: Catalog::default(),
            ledger: Ledger::default(),
            cart: Cart::default(),
            tax: TaxSettings::default(),
            default_margin_percent: DEFAULT_MARGIN_PERCENT,
        }
    }
}

impl AppState {
    pub fn from_persisted(persisted: PersistedState) -> Self {
        let mut state = Self::default();
        state.apply_persisted(persisted);
        state
    }

    pub fn apply_persisted(&mut self, persisted: PersistedState) {
        self.catalog = Catalog::from_products(persisted.products);
        self.ledger = Ledger::from_transactions(persisted.transactions);
        self.tax = persisted.tax;
        self.default_margin_percent = persisted.default_margin_percent;
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            products: self.catalog.to_vec(),
            transactions: self.ledger.transactions().to_vec(),
            tax: self.tax.clone(),
            default_margin_percent: self.default_margin_percent,
        }
    }

    /// Adds `quantity` of a catalog product to the cart.
    pub fn add_to_cart(&mut self, product_id: &str, quantity: u32) -> Result<(), CatalogError> {
        let product = self
            .catalog
            .get(product_id)
            .ok_or_else(|| CatalogError::NotFound(product_id.to_string()))?;
        self.cart.add(product, quantity);
        Ok(())
    }

    /// Checks out the cart, records the sale and empties the cart.
    pub fn checkout(&mut self, payment: PaymentRequest) -> Result<Transaction, CheckoutError> {
        let transaction = checkout(&self.cart, &mut self.catalog, &self.tax, payment)?;
        self.ledger.record(transaction.clone());
        self.cart.clear();
        Ok(transaction)
    }

    /// Runs the HPP calculation for a product and stores the unit cost on it.
    pub fn calculate_product_cost(
        &mut self,
        product_id: &str,
        input: &CostCalculationInput,
        adopt_price: bool,
    ) -> Result<(CostCalculationResult, Product), ProductCostError> {
        let result = compute_unit_cost(input)?;
        let product = self
            .catalog
            .apply_cost_calculation(product_id, &result, adopt_price)?
            .clone();
        Ok((result, product))
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ProductCostError {
    #[error(transparent)]
    Calculation(#[from] CostCalculationError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub tax: TaxSettings,
    #[serde(default = "default_margin")]
    pub default_margin_percent: Decimal,
}

impl Default for PersistedState {
    fn default() -> Self {
        AppState::default().to_persisted()
    }
}

fn default_margin() -> Decimal {
    DEFAULT_MARGIN_PERCENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{NewProduct, PaymentMethod};
    use crate::domain::hpp::RawMaterialLine;
    use rust_decimal_macros::dec;

    fn state_with_product() -> (AppState, String) {
        let mut state = AppState::default();
        let id = state
            .catalog
            .add(NewProduct {
                name: "Brownies".to_string(),
                category: Some("Kue".to_string()),
                unit: "potong".to_string(),
                selling_price: dec!(2000),
                hpp: None,
                stock: 20,
            })
            .unwrap()
            .id;
        (state, id)
    }

    #[test]
    fn hpp_flows_into_checkout_profit() {
        let (mut state, id) = state_with_product();
        let input = CostCalculationInput {
            raw_materials: vec![RawMaterialLine {
                name: "Coklat".to_string(),
                unit_cost: dec!(5000),
                quantity_used: dec!(2),
                unit: "batang".to_string(),
            }],
            operating_costs: vec![],
            target_units: dec!(10),
            margin_percent: dec!(40),
        };

        let (result, product) = state.calculate_product_cost(&id, &input, true).unwrap();
        assert_eq!(result.unit_cost, dec!(1000));
        assert_eq!(product.selling_price, dec!(1400));

        state.add_to_cart(&id, 5).unwrap();
        let tx = state
            .checkout(PaymentRequest::exact(PaymentMethod::Transfer))
            .unwrap();
        assert_eq!(tx.total, dec!(7000));
        assert!(state.cart.is_empty());

        let summary = state.ledger.summary(None, None);
        assert_eq!(summary.gross_profit, dec!(2000));
        assert_eq!(state.catalog.get(&id).unwrap().stock, 15);
    }

    #[test]
    fn failed_calculation_leaves_product_alone() {
        let (mut state, id) = state_with_product();
        let input = CostCalculationInput {
            raw_materials: vec![],
            operating_costs: vec![],
            target_units: dec!(0),
            margin_percent: dec!(10),
        };

        let err = state.calculate_product_cost(&id, &input, true).unwrap_err();
        assert!(matches!(err, ProductCostError::Calculation(_)));
        assert_eq!(state.catalog.get(&id).unwrap().hpp, None);
    }

    #[test]
    fn persisted_round_trip() {
        let (mut state, id) = state_with_product();
        state.tax.enabled = true;
        state.add_to_cart(&id, 1).unwrap();
        state.checkout(PaymentRequest::cash(dec!(5000))).unwrap();

        let restored = AppState::from_persisted(state.to_persisted());
        assert_eq!(restored.catalog.len(), 1);
        assert_eq!(restored.ledger.len(), 1);
        assert!(restored.tax.enabled);
        assert!(restored.cart.is_empty());
    }

    #[test]
    fn persisted_defaults_fill_missing_fields() {
        let parsed: PersistedState = serde_json::from_str("{}").unwrap();
        assert!(parsed.products.is_empty());
        assert_eq!(parsed.default_margin_percent, dec!(30));
        assert_eq!(parsed.tax, TaxSettings::default());
    }
}
