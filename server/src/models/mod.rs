// server/src/models/mod.rs

//! Records persisted by the store, plus the input shapes used to create and
//! update them.

pub mod account;
pub mod brand;
pub mod category;
pub mod order;
pub mod order_item;
pub mod product;
pub mod session;

pub use account::{Account, AccountType, NewAccount, ProfileUpdate, Registration, Role, Roles};
pub use brand::{Brand, NewBrand};
pub use category::{Category, NewCategory};
pub use order::{NewOrder, Order, OrderAdminUpdate, OrderLineRequest, OrderStatus, PaymentMethod, PlaceOrderRequest};
pub use order_item::{NewOrderItem, OrderItem};
pub use product::{NewProduct, NewProductImage, Product, ProductImage, ProductUpdate};
pub use session::Session;
