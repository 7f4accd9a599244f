// Hive dashboard - Live climate charts fed from the hive's sensor backend
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
