pub mod fields;
pub mod labels;
pub mod trial;
