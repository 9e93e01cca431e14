pub mod autocomplete;
pub mod openapi;
pub mod searchad;

pub use autocomplete::*;
pub use openapi::*;
pub use searchad::*;
