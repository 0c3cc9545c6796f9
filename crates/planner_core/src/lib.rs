pub mod calendar;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod notify;
pub mod remote;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod task_api;
