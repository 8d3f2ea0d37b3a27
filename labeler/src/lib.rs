pub mod classify;
pub mod config;
pub mod denoise;
pub mod io;
pub mod layout;
pub mod pipeline;
pub mod runtime;
pub mod sim;
pub mod stats;
pub mod util;

mod error;
pub use self::error::*;
