pub mod controller;
pub mod logger;
pub mod manager;
pub mod scheduler;
pub mod support;
pub mod work;
pub mod worker;
