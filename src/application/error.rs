use thiserror::Error;

use crate::domain::{ItemId, OrderId, Units};

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Ledger not initialized. Run 'init' first")]
    NotInitialized,

    #[error("Ledger already initialized (owner: {0})")]
    AlreadyInitialized(String),

    #[error("Caller '{0}' is not the ledger owner")]
    Unauthorized(String),

    #[error("No item listed under id {0}")]
    ItemNotFound(ItemId),

    #[error("Payment of {payment} does not match the listed cost {cost} of item {item_id}")]
    InsufficientPayment {
        item_id: ItemId,
        cost: Units,
        payment: Units,
    },

    #[error("No order {order_id} recorded for buyer '{buyer}'")]
    OrderNotFound { buyer: String, order_id: OrderId },

    #[error("Invalid listing: {0}")]
    InvalidListing(String),

    #[error("Invalid catalog file: {0}")]
    InvalidCatalog(String),

    #[error("Balance is zero, nothing to withdraw")]
    NothingToWithdraw,

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
