pub mod entities;
pub mod error;
pub mod oauth;
pub mod types;
