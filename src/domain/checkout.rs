//! Cart handling and checkout into an income transaction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{Catalog, CatalogError};
use super::entities::{
    Payment, PaymentMethod, Product, ProductId, TaxSettings, Transaction, TransactionItem,
    TransactionKind,
};
use crate::util::{generate_id, unix_now};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("payment of {paid} does not cover total {total}")]
    InsufficientPayment { total: Decimal, paid: Decimal },
    #[error("amount out of range")]
    AmountOutOfRange,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` of a product, merging with an existing line. The line
    /// keeps the price it was first added at.
    pub fn add(&mut self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            line.quantity = line.quantity.saturating_add(quantity);
            return;
        }
        self.lines.push(CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.selling_price,
            unit_cost: product.hpp,
            quantity,
        });
    }

    /// Zero removes the line. Returns `false` when the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) -> bool {
        let Some(index) = self.position(product_id) else {
            return false;
        };
        if quantity == 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = quantity;
        }
        true
    }

    pub fn remove(&mut self, product_id: &str) -> Option<CartLine> {
        self.position(product_id).map(|index| self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// `None` when the sum leaves the `Decimal` range.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.lines
            .iter()
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.line_total()?))
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.product_id == product_id)
    }
}

/// How the customer settles; `amount` only matters for cash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub amount: Decimal,
}

impl PaymentRequest {
    pub fn cash(amount: Decimal) -> Self {
        Self {
            method: PaymentMethod::Cash,
            amount,
        }
    }

    pub fn exact(method: PaymentMethod) -> Self {
        Self {
            method,
            amount: Decimal::ZERO,
        }
    }
}

/// Turns the cart into an income transaction and takes the sold quantities
/// out of stock. Nothing changes on error.
pub fn checkout(
    cart: &Cart,
    catalog: &mut Catalog,
    tax: &TaxSettings,
    payment: PaymentRequest,
) -> Result<Transaction, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let subtotal = cart.subtotal().ok_or(CheckoutError::AmountOutOfRange)?;
    let tax_amount = tax
        .tax_for(subtotal)
        .ok_or(CheckoutError::AmountOutOfRange)?;
    let total = subtotal
        .checked_add(tax_amount)
        .ok_or(CheckoutError::AmountOutOfRange)?;

    let paid = match payment.method {
        PaymentMethod::Cash => {
            if payment.amount < total {
                return Err(CheckoutError::InsufficientPayment {
                    total,
                    paid: payment.amount,
                });
            }
            payment.amount
        }
        PaymentMethod::Transfer | PaymentMethod::Qris => total,
    };

    let cost_of_goods = cart
        .lines()
        .iter()
        .filter_map(|line| {
            line.unit_cost
                .map(|cost| cost.checked_mul(Decimal::from(line.quantity)))
        })
        .try_fold(Decimal::ZERO, |sum, cost| sum.checked_add(cost?))
        .ok_or(CheckoutError::AmountOutOfRange)?;

    let requests: Vec<(ProductId, u32)> = cart
        .lines()
        .iter()
        .map(|line| (line.product_id.clone(), line.quantity))
        .collect();
    catalog.take_stock(&requests)?;

    let items: Vec<TransactionItem> = cart
        .lines()
        .iter()
        .map(|line| TransactionItem {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            unit_cost: line.unit_cost,
        })
        .collect();

    let description = match items.as_slice() {
        [only] => format!("Penjualan {} x{}", only.name, only.quantity),
        _ => format!("Penjualan {} item", cart.item_count()),
    };

    Ok(Transaction {
        id: generate_id("trx"),
        kind: TransactionKind::Income,
        description,
        items,
        subtotal,
        tax: tax_amount,
        total,
        cost_of_goods,
        payment: Some(Payment {
            method: payment.method,
            paid,
            change: paid - total,
        }),
        recorded_at: unix_now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NewProduct;
    use rust_decimal_macros::dec;

    fn stocked_catalog() -> (Catalog, Product, Product) {
        let mut catalog = Catalog::new();
        let tea = catalog
            .add(NewProduct {
                name: "Es Teh".to_string(),
                category: None,
                unit: "gelas".to_string(),
                selling_price: dec!(3000),
                hpp: Some(dec!(1200)),
                stock: 10,
            })
            .unwrap();
        let bread = catalog
            .add(NewProduct {
                name: "Roti Bakar".to_string(),
                category: None,
                unit: "porsi".to_string(),
                selling_price: dec!(12000),
                hpp: None,
                stock: 2,
            })
            .unwrap();
        (catalog, tea, bread)
    }

    #[test]
    fn cart_merges_and_edits_lines() {
        let (_, tea, bread) = stocked_catalog();
        let mut cart = Cart::new();
        cart.add(&tea, 2);
        cart.add(&tea, 1);
        cart.add(&bread, 1);
        cart.add(&bread, 0);

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.subtotal(), Some(dec!(21000)));

        assert!(cart.set_quantity(&tea.id, 1));
        assert_eq!(cart.subtotal(), Some(dec!(15000)));
        assert!(cart.set_quantity(&bread.id, 0));
        assert_eq!(cart.lines().len(), 1);
        assert!(!cart.set_quantity("missing", 3));
        assert!(cart.remove(&tea.id).is_some());
        assert!(cart.is_empty());
    }

    #[test]
    fn cash_checkout_with_tax() {
        let (mut catalog, tea, bread) = stocked_catalog();
        let mut cart = Cart::new();
        cart.add(&tea, 2);
        cart.add(&bread, 1);
        let tax = TaxSettings {
            enabled: true,
            ..TaxSettings::default()
        };

        let tx = checkout(&cart, &mut catalog, &tax, PaymentRequest::cash(dec!(25000))).unwrap();

        assert_eq!(tx.kind, TransactionKind::Income);
        assert_eq!(tx.subtotal, dec!(18000));
        assert_eq!(tx.tax, dec!(1980));
        assert_eq!(tx.total, dec!(19980));
        // Only the tea has a known HPP.
        assert_eq!(tx.cost_of_goods, dec!(2400));
        let payment = tx.payment.unwrap();
        assert_eq!(payment.change, dec!(5020));
        assert_eq!(catalog.get(&tea.id).unwrap().stock, 8);
        assert_eq!(catalog.get(&bread.id).unwrap().stock, 1);
    }

    #[test]
    fn non_cash_settles_exactly() {
        let (mut catalog, tea, _) = stocked_catalog();
        let mut cart = Cart::new();
        cart.add(&tea, 1);

        let tx = checkout(
            &cart,
            &mut catalog,
            &TaxSettings::default(),
            PaymentRequest::exact(PaymentMethod::Qris),
        )
        .unwrap();
        let payment = tx.payment.unwrap();
        assert_eq!(payment.paid, dec!(3000));
        assert_eq!(payment.change, Decimal::ZERO);
        assert_eq!(tx.description, "Penjualan Es Teh x1");
    }

    #[test]
    fn rejects_empty_cart_and_short_payment() {
        let (mut catalog, tea, _) = stocked_catalog();
        let tax = TaxSettings::default();
        assert_eq!(
            checkout(&Cart::new(), &mut catalog, &tax, PaymentRequest::cash(dec!(1))),
            Err(CheckoutError::EmptyCart)
        );

        let mut cart = Cart::new();
        cart.add(&tea, 2);
        assert_eq!(
            checkout(&cart, &mut catalog, &tax, PaymentRequest::cash(dec!(5000))),
            Err(CheckoutError::InsufficientPayment {
                total: dec!(6000),
                paid: dec!(5000),
            })
        );
        assert_eq!(catalog.get(&tea.id).unwrap().stock, 10);
    }

    #[test]
    fn stock_shortfall_leaves_catalog_untouched() {
        let (mut catalog, tea, bread) = stocked_catalog();
        let mut cart = Cart::new();
        cart.add(&tea, 1);
        cart.add(&bread, 3);

        let err = checkout(
            &cart,
            &mut catalog,
            &TaxSettings::default(),
            PaymentRequest::exact(PaymentMethod::Transfer),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Catalog(CatalogError::InsufficientStock { requested: 3, .. })
        ));
        assert_eq!(catalog.get(&tea.id).unwrap().stock, 10);
    }

    #[test]
    fn oversized_totals_are_rejected_before_stock_moves() {
        let mut catalog = Catalog::new();
        let gold = catalog
            .add(NewProduct {
                name: "Emas Batangan".to_string(),
                category: None,
                unit: "pcs".to_string(),
                selling_price: Decimal::MAX,
                hpp: None,
                stock: 5,
            })
            .unwrap();
        let mut cart = Cart::new();
        cart.add(&gold, 2);
        assert_eq!(cart.subtotal(), None);

        let err = checkout(
            &cart,
            &mut catalog,
            &TaxSettings::default(),
            PaymentRequest::exact(PaymentMethod::Transfer),
        )
        .unwrap_err();

        assert_eq!(err, CheckoutError::AmountOutOfRange);
        assert_eq!(catalog.get(&gold.id).unwrap().stock, 5);
    }
}
