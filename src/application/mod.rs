pub mod dispatch;
pub mod error;
pub mod jobs;
pub mod oauth;
pub mod publish;
pub mod render;
pub mod repos;
pub mod storage;
