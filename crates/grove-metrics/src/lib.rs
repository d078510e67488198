pub mod classification;
pub mod regression;
pub mod roc;

pub use classification::*;
pub use regression::*;
pub use roc::*;
