pub mod content;
pub mod entity;
pub mod field;
