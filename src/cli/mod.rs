pub mod app;
pub mod catalog;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod order;
pub mod output;
pub mod runtime;
pub mod serve;
pub mod status_check;

pub use app::run;
