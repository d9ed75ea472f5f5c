//! Typed clients over the store actors.
//!
//! [`CatalogClient`] and [`OrderClient`] are the core services.
//! [`Storefront`] and [`AdminConsole`] bind them to a [`Session`](crate::domain::Session)
//! and apply the caller-side rules.

mod admin_console;
mod catalog_client;
mod order_client;
mod profile_client;
mod storefront;

pub use admin_console::AdminConsole;
pub use catalog_client::CatalogClient;
pub use order_client::OrderClient;
pub use profile_client::{Profile, ProfileClient};
pub use storefront::Storefront;
