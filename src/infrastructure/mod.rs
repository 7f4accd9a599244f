// Infrastructure layer - External dependencies and adapters
pub mod chart_board;
pub mod config;
pub mod prompt_board;
pub mod rest_source;
