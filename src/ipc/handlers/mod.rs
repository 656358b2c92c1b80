pub mod assignments;
pub mod backup;
pub mod catalog;
pub mod core;
pub mod people;
pub mod records;
pub mod survey;
