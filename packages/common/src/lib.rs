pub mod error;
pub mod geometry;
pub mod result;
pub mod tree;
pub mod visitor;

pub use error::*;
pub use geometry::*;
pub use result::*;
pub use tree::*;
pub use visitor::*;
