//! Reading and writing coefficient datasets

mod json;

pub use json::{read_dataset, read_dataset_from_buffer, write_dataset, write_dataset_to_buffer};
