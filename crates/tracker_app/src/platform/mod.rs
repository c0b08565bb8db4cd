mod app;
mod config;
mod effects;
mod history;
mod logging;
mod render;

pub use app::run;
pub use logging::LogDestination;
