pub mod builders;

pub use builders::{ResourceBuilder, TableBuilder};
