pub mod chat;
pub mod sources;
pub mod viewer;
