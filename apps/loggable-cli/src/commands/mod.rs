pub mod demo;
pub mod history;
pub mod revert;
pub mod store;
pub mod verify;
