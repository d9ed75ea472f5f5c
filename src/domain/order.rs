use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CatalogItem;

/// Per-line fulfilment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    Pending,
    Completed,
    Cancelled,
}

impl LineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LineStatus::Pending => "pending",
            LineStatus::Completed => "completed",
            LineStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled lines are final under the terminal policy.
    pub fn is_final(self) -> bool {
        matches!(self, LineStatus::Completed | LineStatus::Cancelled)
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("Unknown value: {0}")]
pub struct UnknownValue(pub String);

impl FromStr for LineStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(LineStatus::Pending),
            "completed" => Ok(LineStatus::Completed),
            "cancelled" | "canceled" => Ok(LineStatus::Cancelled),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

/// Opaque payment tag. Recorded on the order, never settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Card,
    Wallet,
}

impl FromStr for PaymentMethod {
    type Err = UnknownValue;

    /// Accepts the canonical tags plus the card/wallet brand names older
    /// documents were written with.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CARD" | "VISA" | "MASTERCARD" => Ok(PaymentMethod::Card),
            "WALLET" | "GCASH" => Ok(PaymentMethod::Wallet),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

/// One requested (item, quantity, variant) tuple handed to `place_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub catalog_item_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_color: Option<String>,
}

impl Selection {
    pub fn new(catalog_item_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            catalog_item_id: catalog_item_id.into(),
            quantity,
            variant_size: None,
            variant_color: None,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.variant_size = Some(size.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.variant_color = Some(color.into());
        self
    }
}

/// A line of a placed order: a frozen snapshot of the catalog item plus its
/// own status and approval flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub catalog_item_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_color: Option<String>,
    pub status: LineStatus,
    pub approved: bool,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderLine {
    pub fn snapshot(item: &CatalogItem, selection: &Selection, now: DateTime<Utc>) -> Self {
        Self {
            catalog_item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            quantity: selection.quantity,
            variant_size: selection.variant_size.clone(),
            variant_color: selection.variant_color.clone(),
            status: LineStatus::Pending,
            approved: false,
            saved_at: now,
            updated_at: None,
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }

    /// Sets the status; approval follows it in the same write
    /// (`approved == (status != cancelled)`).
    pub fn set_status(&mut self, status: LineStatus, now: DateTime<Utc>) {
        self.status = status;
        self.approved = status != LineStatus::Cancelled;
        self.updated_at = Some(now);
    }

    pub fn set_approval(&mut self, approved: bool, now: DateTime<Utc>) {
        self.approved = approved;
        self.updated_at = Some(now);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Taken from the document path, never stored in the body.
    #[serde(skip)]
    pub id: String,
    pub owner_id: String,
    pub payment_method: PaymentMethod,
    pub placed_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    pub fn total(&self) -> f64 {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }

    pub fn lines_for<'a>(&'a self, catalog_item_id: &'a str) -> impl Iterator<Item = &'a OrderLine> + 'a {
        self.lines
            .iter()
            .filter(move |line| line.catalog_item_id == catalog_item_id)
    }

    /// The line saved most recently; the first one wins on ties.
    pub fn latest_line(&self) -> Option<&OrderLine> {
        self.lines.iter().fold(None, |latest: Option<&OrderLine>, line| match latest {
            Some(current) if line.saved_at <= current.saved_at => Some(current),
            _ => Some(line),
        })
    }

    /// Status of the latest line, used to summarise a whole order.
    pub fn representative_status(&self) -> LineStatus {
        self.latest_line()
            .map_or(LineStatus::Pending, |line| line.status)
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.latest_line()
            .map_or(self.placed_at, |line| line.saved_at)
    }
}

/// Most recent first: latest line `saved_at`, then `placed_at`, then id.
pub fn sort_most_recent_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        b.last_activity()
            .cmp(&a.last_activity())
            .then_with(|| b.placed_at.cmp(&a.placed_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}
