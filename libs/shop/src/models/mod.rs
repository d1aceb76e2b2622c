//! Marketplace models

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

// Re-export for convenience
pub use cart::{CartLine, CartOwner, CartView, Identity, MAX_LINE_QUANTITY, MergePolicy};
pub use order::{
    AdminOrder, Customer, CustomerDetails, NewOrder, Order, OrderItem, OrderStatus, StoreStats,
};
pub use product::{NewProduct, Product, ProductFilter, ProductSort, ProductUpdate, Specifications};
pub use user::{LoginCredentials, NewUser, ProfileUpdate, Registration, Role, User, has_role};
