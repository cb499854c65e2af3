//! Domain models for the storefront.

pub mod cart;
pub mod flash;
pub mod order;
pub mod product;
pub mod review;
pub mod session;
pub mod user;

pub use cart::{Cart, CartLine};
pub use flash::Flash;
pub use order::{NewOrderLine, Order, OrderDetail, OrderLine};
pub use product::{Product, ProductInput};
pub use review::{Review, ReviewInput, ReviewListing};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, ProfileUpdate, User};
