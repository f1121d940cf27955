pub mod filter;
pub mod knn;

pub use filter::*;
pub use knn::*;
