pub mod datasheet;
pub mod prediction;
