pub mod adjustment;
pub mod comparison;
pub mod formatter;
pub mod history;
pub mod localization;
pub mod table;
