//! Catalog products.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A product listed by exactly one seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: UserId,
    pub title: String,
    pub description: String,
    pub price: Money,
    pub quantity_available: u32,
    pub images: Vec<String>,
    pub category: String,
    /// Delisted products stay in the table so order history keeps its references.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Units that can be sold right now. Delisted products sell nothing.
    pub fn available_quantity(&self) -> u32 {
        if self.active {
            self.quantity_available
        } else {
            0
        }
    }

    /// Returns true if `user` owns this listing.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.seller_id == user
    }

    /// Applies an already validated partial update.
    pub fn apply_update(&mut self, update: &ProductUpdate, now: DateTime<Utc>) {
        if let Some(ref title) = update.title {
            self.title = title.clone();
        }
        if let Some(ref description) = update.description {
            self.description = description.clone();
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(quantity) = update.quantity_available {
            self.quantity_available = quantity;
        }
        if let Some(ref images) = update.images {
            self.images = images.clone();
        }
        if let Some(ref category) = update.category {
            self.category = category.clone();
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.updated_at = now;
    }
}

/// Input for creating a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub quantity_available: u32,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
}

impl NewProduct {
    /// Validates the input and builds an active product owned by `seller_id`.
    pub fn into_product(self, seller_id: UserId, now: DateTime<Utc>) -> Result<Product, DomainError> {
        Ok(Product {
            id: ProductId::new(),
            seller_id,
            title: required("title", self.title)?,
            description: self.description.trim().to_string(),
            price: validate_price(self.price)?,
            quantity_available: self.quantity_available,
            images: self.images,
            category: required("category", self.category)?,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a listing. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub quantity_available: Option<u32>,
    pub images: Option<Vec<String>>,
    pub category: Option<String>,
    pub active: Option<bool>,
}

impl ProductUpdate {
    /// Validates and normalizes every field that is set.
    pub fn validate(self) -> Result<Self, DomainError> {
        Ok(Self {
            title: self.title.map(|t| required("title", t)).transpose()?,
            description: self.description.map(|d| d.trim().to_string()),
            price: self.price.map(validate_price).transpose()?,
            quantity_available: self.quantity_available,
            images: self.images,
            category: self.category.map(|c| required("category", c)).transpose()?,
            active: self.active,
        })
    }
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub seller_id: Option<UserId>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if !self.include_inactive && !product.active {
            return false;
        }
        if let Some(ref category) = self.category
            && &product.category != category
        {
            return false;
        }
        if let Some(seller_id) = self.seller_id
            && product.seller_id != seller_id
        {
            return false;
        }
        true
    }
}

fn required(field: &str, value: String) -> Result<String, DomainError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(value)
}

fn validate_price(price: Money) -> Result<Money, DomainError> {
    if !price.is_positive() {
        return Err(DomainError::InvalidPrice {
            price: price.to_string(),
        });
    }
    Ok(price)
}
