pub mod backup;
pub mod history;
pub mod mapping;
