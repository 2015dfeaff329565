//! Product catalog: the record an HPP result is stored against.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use thiserror::Error;

use super::entities::{NewProduct, Product, ProductId};
use super::hpp::CostCalculationResult;
use crate::util::generate_id;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("product not found: {0}")]
    NotFound(ProductId),
    #[error("invalid product: {0}")]
    InvalidProduct(String),
    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        requested: u32,
        available: u32,
    },
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: BTreeMap<ProductId, Product>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_products(products: Vec<Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|product| (product.id.clone(), product))
                .collect(),
        }
    }

    pub fn add(&mut self, new: NewProduct) -> Result<Product, CatalogError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidProduct("name is empty".to_string()));
        }
        validate_price("selling_price", new.selling_price)?;
        if let Some(hpp) = new.hpp {
            validate_price("hpp", hpp)?;
        }

        let product = Product {
            id: generate_id("prd"),
            name: name.to_string(),
            category: new
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            unit: new.unit,
            selling_price: new.selling_price,
            hpp: new.hpp,
            stock: new.stock,
        };
        self.products.insert(product.id.clone(), product.clone());
        Ok(product)
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Result<Product, CatalogError> {
        self.products
            .remove(id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    pub fn update_price(&mut self, id: &str, price: Decimal) -> Result<&Product, CatalogError> {
        validate_price("selling_price", price)?;
        let product = self.get_mut(id)?;
        product.selling_price = price;
        Ok(product)
    }

    /// Stores the HPP from a calculation; `adopt_price` also takes over the recommended price.
    pub fn apply_cost_calculation(
        &mut self,
        id: &str,
        result: &CostCalculationResult,
        adopt_price: bool,
    ) -> Result<&Product, CatalogError> {
        let product = self.get_mut(id)?;
        product.hpp = Some(result.unit_cost);
        if adopt_price {
            product.selling_price = result.recommended_price;
        }
        Ok(product)
    }

    pub fn restock(&mut self, id: &str, quantity: u32) -> Result<&Product, CatalogError> {
        let product = self.get_mut(id)?;
        product.stock = product.stock.saturating_add(quantity);
        Ok(product)
    }

    /// Verifies every requested quantity before taking any of them.
    pub fn take_stock(&mut self, requests: &[(ProductId, u32)]) -> Result<(), CatalogError> {
        let mut needed: BTreeMap<&str, u32> = BTreeMap::new();
        for (id, quantity) in requests {
            let entry = needed.entry(id.as_str()).or_default();
            *entry = entry.saturating_add(*quantity);
        }

        for (id, quantity) in &needed {
            let product = self
                .products
                .get(*id)
                .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
            if !product.in_stock(*quantity) {
                return Err(CatalogError::InsufficientStock {
                    name: product.name.clone(),
                    requested: *quantity,
                    available: product.stock,
                });
            }
        }

        for (id, quantity) in needed {
            if let Some(product) = self.products.get_mut(id) {
                product.stock -= quantity;
            }
        }
        Ok(())
    }

    /// Case-insensitive match on name or category.
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        self.products
            .values()
            .filter(|product| {
                needle.is_empty()
                    || product.name.to_lowercase().contains(&needle)
                    || product
                        .category
                        .as_ref()
                        .map(|c| c.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .collect()
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Product> {
        self.products.values().cloned().collect()
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Product, CatalogError> {
        self.products
            .get_mut(id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}

fn validate_price(field: &str, value: Decimal) -> Result<(), CatalogError> {
    if value < Decimal::ZERO {
        return Err(CatalogError::InvalidProduct(format!(
            "{field} must not be negative"
        )));
    }
    Ok(())
}
