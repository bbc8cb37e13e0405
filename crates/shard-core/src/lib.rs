pub mod account;
pub mod arithmetic;
pub mod constants;
pub mod error;
pub mod signals;
pub mod types;

pub use account::*;
pub use arithmetic::*;
pub use constants::*;
pub use error::{SerializationError, ShardError, ShardResult};
pub use signals::*;
pub use types::*;
