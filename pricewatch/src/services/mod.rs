//! Application services.

pub mod container;
pub mod product;

pub use container::ServiceContainer;
pub use product::{NewProduct, ProductService, RegisteredProduct};
