use serde::{Deserialize, Serialize};

use super::Units;

/// Caller-supplied positive catalog key.
pub type ItemId = i64;

/// A product listed in the store catalog.
///
/// Items are keyed by a caller-supplied positive id. Listing an id that is
/// already in use replaces the stored entry; orders keep their own value
/// snapshot, so replacement never rewrites purchase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: String,
    pub image: String,
    /// Exact purchase price in the smallest payment unit.
    pub cost: Units,
    /// Display rating, conventionally 1-5. Stored as given, not enforced.
    pub rating: i64,
    /// Remaining inventory shown to shoppers. Depleted by purchases and
    /// floored at zero; a purchase is never rejected for lack of stock.
    pub stock: i64,
}

impl Item {
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        category: impl Into<String>,
        image: impl Into<String>,
        cost: Units,
        rating: i64,
        stock: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            image: image.into(),
            cost,
            rating,
            stock,
        }
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Stock level after one sale: down by one, never below zero.
    pub fn stock_after_sale(&self) -> i64 {
        (self.stock - 1).max(0)
    }

    /// Validate the fields a listing must satisfy.
    pub fn validate(&self) -> Result<(), ListingError> {
        if self.id <= 0 {
            return Err(ListingError::NonPositiveId(self.id));
        }
        if self.name.is_empty() {
            return Err(ListingError::EmptyName);
        }
        if self.cost < 0 {
            return Err(ListingError::NegativeCost(self.cost));
        }
        if self.stock < 0 {
            return Err(ListingError::NegativeStock(self.stock));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingError {
    NonPositiveId(ItemId),
    EmptyName,
    NegativeCost(Units),
    NegativeStock(i64),
}

impl std::fmt::Display for ListingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingError::NonPositiveId(id) => {
                write!(f, "item id must be positive, got {}", id)
            }
            ListingError::EmptyName => write!(f, "item name must not be empty"),
            ListingError::NegativeCost(cost) => {
                write!(f, "cost must not be negative, got {}", cost)
            }
            ListingError::NegativeStock(stock) => {
                write!(f, "stock must not be negative, got {}", stock)
            }
        }
    }
}

impl std::error::Error for ListingError {}
