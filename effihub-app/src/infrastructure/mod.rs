pub mod auth;
pub mod cache;
pub mod db;
pub mod realtime;
pub mod storage;
