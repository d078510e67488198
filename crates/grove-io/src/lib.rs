pub mod error;
pub mod csv_io;
pub mod model_io;

pub use error::{PersistError, PersistResult};
pub use csv_io::{read_subjects, read_subjects_from};
pub use model_io::{load_model, load_spec, save_model};
