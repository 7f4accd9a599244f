// Domain layer - Samples, stores and monitor layouts
pub mod monitor_kind;
pub mod sample;
pub mod store;
pub mod watermark;
