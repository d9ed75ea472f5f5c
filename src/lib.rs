//! Order engine, catalog mirror and live order feeds for a student
//! merchandise storefront.
//!
//! Everything runs on tokio actors: a document store actor owns orders,
//! customers and the catalog, a second store actor holds user profiles, and
//! typed clients talk to them over channels. Start with
//! [`OrderSystem`](app_system::OrderSystem).

pub mod app_system;
pub mod clients;
pub mod clock;
pub mod domain;
pub mod store;
pub mod sync;

#[cfg(test)]
mod mock_framework;

pub use app_system::{setup_tracing, CatalogError, ConfigError, OrderError, OrderSystem, SystemConfig};
pub use clients::{AdminConsole, CatalogClient, OrderClient, ProfileClient, Storefront};
pub use domain::{Cart, CatalogItem, LinePolicy, LineStatus, Order, OrderLine, PaymentMethod, Selection, Session, Wishlist};
pub use sync::Subscription;
