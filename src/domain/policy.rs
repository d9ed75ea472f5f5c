//! Caller-side transition rules. The order engine itself accepts any
//! transition; the storefront and admin console hand these checks to it as
//! guards, evaluated against the freshly read line on every attempt.

use std::str::FromStr;

use thiserror::Error;

use super::{LineStatus, OrderLine, UnknownValue};

/// A transition refused by a caller-side rule. Surfaces to callers as
/// `OrderError::InvariantViolation`.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct PolicyViolation(pub String);

/// How the admin console treats completed and cancelled lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinePolicy {
    /// Completed and cancelled lines accept no further status change, and a
    /// cancelled line cannot be approved. Re-purchase needs a new order.
    #[default]
    Terminal,
    /// Any transition is allowed.
    Permissive,
}

impl FromStr for LinePolicy {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "terminal" => Ok(LinePolicy::Terminal),
            "permissive" => Ok(LinePolicy::Permissive),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

impl LinePolicy {
    pub fn check_status(self, line: &OrderLine, next: LineStatus) -> Result<(), PolicyViolation> {
        if self == LinePolicy::Terminal && line.status.is_final() {
            return Err(PolicyViolation(format!(
                "Item {} is already {} and cannot be set to {}",
                line.catalog_item_id, line.status, next
            )));
        }
        Ok(())
    }

    pub fn check_approval(self, line: &OrderLine, approved: bool) -> Result<(), PolicyViolation> {
        if self == LinePolicy::Terminal && approved && line.status == LineStatus::Cancelled {
            return Err(PolicyViolation(format!(
                "Item {} was cancelled and cannot be approved",
                line.catalog_item_id
            )));
        }
        Ok(())
    }
}

/// Customers may only cancel lines that are still pending.
pub fn check_customer_cancel(line: &OrderLine) -> Result<(), PolicyViolation> {
    match line.status {
        LineStatus::Completed => Err(PolicyViolation(
            "You cannot cancel a completed order.".to_string(),
        )),
        LineStatus::Cancelled => Err(PolicyViolation(
            "This item has already been cancelled.".to_string(),
        )),
        LineStatus::Pending => Ok(()),
    }
}
