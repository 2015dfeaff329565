//! Bookkeeping domain: HPP calculation, catalog, checkout and ledger.

pub mod app_state;
pub mod catalog;
pub mod checkout;
pub mod entities;
pub mod hpp;
pub mod ledger;
pub mod pricing;

pub use app_state::{AppState, PersistedState, ProductCostError, DEFAULT_MARGIN_PERCENT};
pub use catalog::{Catalog, CatalogError};
pub use checkout::{checkout, Cart, CartLine, CheckoutError, PaymentRequest};
pub use entities::{
    NewProduct, Payment, PaymentMethod, Product, ProductId, TaxSettings, Transaction,
    TransactionId, TransactionItem, TransactionKind,
};
pub use hpp::{
    compute_unit_cost, CostCalculationError, CostCalculationInput, CostCalculationResult,
    OperatingCostLine, RawMaterialLine,
};
pub use ledger::{Ledger, LedgerError, LedgerSummary};
pub use pricing::{
    accept_candidate, fallback_suggestion, CandidateSuggestion, PriceSuggestion, PricingRequest,
    SuggestionSource,
};
