pub mod error;
pub mod subject;
pub mod encode;

pub use error::{GroveError, GroveResult};
pub use subject::Subject;
pub use encode::{categorical_value, numeric_value, tabulate, Codebook, Encoder, ExtraColumn, Row};
