use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stock below this many units is shown as running low.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// A sellable item as seen by the cart and the order engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Taken from the document path, never stored in the body.
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub price: f64,
    pub stock_quantity: u32,
    #[serde(default)]
    pub color_options: Vec<String>,
    #[serde(default)]
    pub size_options: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    OutOfStock,
    Low(u32),
    Available(u32),
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64, stock_quantity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock_quantity,
            color_options: Vec::new(),
            size_options: Vec::new(),
            category: String::new(),
            description: String::new(),
            last_updated: None,
        }
    }

    pub fn with_colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.color_options = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sizes<I, S>(mut self, sizes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.size_options = sizes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Removes `quantity` units, clamping at zero. Returns the remaining stock.
    pub fn deduct(&mut self, quantity: u32) -> u32 {
        self.stock_quantity = self.stock_quantity.saturating_sub(quantity);
        self.stock_quantity
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    pub fn stock_level(&self) -> StockLevel {
        match self.stock_quantity {
            0 => StockLevel::OutOfStock,
            n if n < LOW_STOCK_THRESHOLD => StockLevel::Low(n),
            n => StockLevel::Available(n),
        }
    }
}
