pub mod enquiry;
pub mod item;

pub use enquiry::*;
pub use item::*;
