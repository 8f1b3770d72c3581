//! Request handlers.

pub mod feed;
pub mod health;
pub mod upload;

pub use feed::*;
pub use health::*;
pub use upload::*;
