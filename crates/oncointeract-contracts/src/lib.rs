pub mod analysis;
pub mod catalog;
pub mod events;
pub mod form;
pub mod models;
pub mod report;
pub mod session;
