pub mod cart;
pub mod catalog;
pub mod order;
pub mod policy;
pub mod session;
pub mod wishlist;

pub use cart::*;
pub use catalog::*;
pub use order::*;
pub use policy::*;
pub use session::*;
pub use wishlist::*;
