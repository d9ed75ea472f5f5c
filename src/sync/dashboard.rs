use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{LineStatus, Order};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.completed + self.cancelled
    }

    fn record(&mut self, status: LineStatus) {
        match status {
            LineStatus::Pending => self.pending += 1,
            LineStatus::Completed => self.completed += 1,
            LineStatus::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    pub order_id: String,
    pub owner_id: String,
    pub placed_at: DateTime<Utc>,
    pub status: LineStatus,
    pub last_activity: DateTime<Utc>,
    pub total: f64,
}

impl From<&Order> for RecentOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            owner_id: order.owner_id.clone(),
            placed_at: order.placed_at,
            status: order.representative_status(),
            last_activity: order.last_activity(),
            total: order.total(),
        }
    }
}

/// Admin overview: every order counted once under the status of its most
/// recently saved line, plus the newest few orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub counts: StatusCounts,
    pub recent: Vec<RecentOrder>,
}

/// Builds a dashboard from a merged order list. Input order does not matter.
pub fn summarize(orders: &[Order], recent_limit: usize) -> Dashboard {
    let mut counts = StatusCounts::default();
    for order in orders {
        counts.record(order.representative_status());
    }

    let mut sorted = orders.to_vec();
    crate::domain::sort_most_recent_first(&mut sorted);
    let recent = sorted.iter().take(recent_limit).map(RecentOrder::from).collect();

    Dashboard { counts, recent }
}
