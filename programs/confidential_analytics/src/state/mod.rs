pub mod batch;
pub mod decryption;
pub mod provider;
pub mod registry;

pub use batch::*;
pub use decryption::*;
pub use provider::*;
pub use registry::*;
