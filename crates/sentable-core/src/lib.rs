//! Core types shared across Sentable: in-memory tables, typed cells,
//! the closed sentiment category set, and the Arrow schemas the engine writes.

pub mod category;
pub mod cell;
pub mod mixed;
pub mod result;
pub mod schema;
pub mod table;

pub use category::{Category, ParseCategoryError};
pub use cell::{Cell, decode_dictionary};
pub use mixed::MixedColumnBuilder;
pub use result::{ClassificationResult, Prediction};
pub use table::{Table, TableError};
