//! Transaction ledger and profit summaries.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, OffsetDateTime};

use super::entities::{Transaction, TransactionId, TransactionKind};
use crate::util::generate_id;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("transaction not found: {0}")]
    NotFound(TransactionId),
    #[error("expense amount must be greater than zero")]
    InvalidAmount,
    #[error("expense description is empty")]
    MissingDescription,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub income: Decimal,
    pub expense: Decimal,
    pub tax_collected: Decimal,
    pub cost_of_goods: Decimal,
    /// Income net of tax and cost of goods sold.
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub transaction_count: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Ledger {
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transactions(mut transactions: Vec<Transaction>) -> Self {
        transactions.sort_by_key(|tx| tx.recorded_at);
        Self { transactions }
    }

    /// Keeps the ledger ordered by `recorded_at`; equal timestamps stay in insertion order.
    pub fn record(&mut self, transaction: Transaction) {
        let index = self
            .transactions
            .partition_point(|tx| tx.recorded_at <= transaction.recorded_at);
        self.transactions.insert(index, transaction);
    }

    pub fn record_expense(
        &mut self,
        description: &str,
        amount: Decimal,
        recorded_at: i64,
    ) -> Result<&Transaction, LedgerError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerError::MissingDescription);
        }
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        let transaction = Transaction {
            id: generate_id("exp"),
            kind: TransactionKind::Expense,
            description: description.to_string(),
            items: Vec::new(),
            subtotal: amount,
            tax: Decimal::ZERO,
            total: amount,
            cost_of_goods: Decimal::ZERO,
            payment: None,
            recorded_at,
        };
        let id = transaction.id.clone();
        self.record(transaction);
        self.get(&id).ok_or(LedgerError::NotFound(id))
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Result<Transaction, LedgerError> {
        let index = self
            .transactions
            .iter()
            .position(|tx| tx.id == id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        Ok(self.transactions.remove(index))
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Transactions with `from <= recorded_at < to`.
    pub fn between(&self, from: i64, to: i64) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .iter()
            .filter(move |tx| tx.recorded_at >= from && tx.recorded_at < to)
    }

    pub fn summary(&self, from: Option<i64>, to: Option<i64>) -> LedgerSummary {
        let from = from.unwrap_or(i64::MIN);
        let to = to.unwrap_or(i64::MAX);
        summarize(self.between(from, to))
    }

    /// Income per UTC calendar day, oldest first.
    pub fn daily_income(&self) -> Vec<(Date, Decimal)> {
        let mut days: BTreeMap<Date, Decimal> = BTreeMap::new();
        for tx in &self.transactions {
            if tx.kind != TransactionKind::Income {
                continue;
            }
            let Ok(moment) = OffsetDateTime::from_unix_timestamp(tx.recorded_at) else {
                continue;
            };
            *days.entry(moment.date()).or_default() += tx.total;
        }
        days.into_iter().collect()
    }
}

fn summarize<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> LedgerSummary {
    let mut summary = LedgerSummary::default();
    for tx in transactions {
        summary.transaction_count += 1;
        match tx.kind {
            TransactionKind::Income => {
                summary.income += tx.total;
                summary.tax_collected += tx.tax;
                summary.cost_of_goods += tx.cost_of_goods;
            }
            TransactionKind::Expense => summary.expense += tx.total,
        }
    }
    summary.gross_profit = summary.income - summary.tax_collected - summary.cost_of_goods;
    summary.net_profit = summary.gross_profit - summary.expense;
    summary
}
