pub mod logging;
pub mod retention;
