pub mod processes;
pub mod window;
