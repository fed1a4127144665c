//! Rows read from the marketplace's primary tables. These are the raw
//! material for reconstructing an activity feed when no audit trail exists.

use {
    super::id::AccountId,
    chrono::{DateTime, Utc},
};

#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// An order (buyer interest in a listing) joined with its buyer.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub id: String,
    pub buyer_id: AccountId,
    pub buyer_name: String,
    pub buyer_email: String,
    pub listing_id: Option<String>,
    pub listing_title: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product listing joined with its seller.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub id: String,
    pub seller_id: AccountId,
    pub seller_name: String,
    pub seller_email: String,
    pub title: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}
