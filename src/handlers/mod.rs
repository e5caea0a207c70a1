pub mod health;
pub mod info;
pub mod pages;
pub mod signaling;
