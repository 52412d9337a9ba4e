pub mod baseline;
pub mod config;
pub mod crawler;
pub mod error;
pub mod price;
pub mod storage;
