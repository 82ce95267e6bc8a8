pub mod admin;
pub mod auth;
pub mod display;
pub mod editor;
pub mod root;
