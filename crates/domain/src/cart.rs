//! Per-buyer cart rows and their validation against catalog availability.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::error::DomainError;
use crate::money::Money;

/// One persisted cart row: a buyer's desired quantity of a product.
///
/// The row exists only while `quantity >= 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub buyer_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

/// What a quantity update does to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// Set the row to this many units.
    Set(u32),
    /// Delete the row.
    Remove,
}

impl QuantityChange {
    /// Interprets a requested quantity: zero or negative removes the row.
    pub fn from_requested(quantity: i64) -> Result<Self, DomainError> {
        if quantity <= 0 {
            return Ok(QuantityChange::Remove);
        }
        u32::try_from(quantity)
            .map(QuantityChange::Set)
            .map_err(|_| DomainError::InvalidQuantity { quantity })
    }
}

/// A cart row joined with the live product it references.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub line_total: Money,
}

/// A buyer's cart with its subtotal at current prices.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub buyer_id: UserId,
    pub lines: Vec<CartLine>,
    pub subtotal: Money,
}

impl CartView {
    /// Builds the view from cart rows joined with their products, in row order.
    pub fn build(
        buyer_id: UserId,
        entries: Vec<(CartItem, Product)>,
    ) -> Result<Self, DomainError> {
        let lines = entries
            .into_iter()
            .map(|(item, product)| {
                let line_total = product.price.checked_mul(item.quantity)?;
                Ok(CartLine {
                    product,
                    quantity: item.quantity,
                    line_total,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        let subtotal = Money::sum(lines.iter().map(|line| line.line_total))?;

        Ok(Self {
            buyer_id,
            lines,
            subtotal,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}
