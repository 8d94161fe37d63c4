pub mod bottom;
pub mod central;
pub mod error;
pub mod side;
pub mod top;
