pub mod error;
pub mod metadata;
pub mod privacy;
pub mod secrets;
pub mod trace;

pub use error::*;
pub use metadata::*;
pub use privacy::*;
pub use secrets::*;
pub use trace::*;
