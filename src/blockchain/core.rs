// core.rs splits the ledger into the record, the chain, validation and the ownership protocol.
pub mod block;
pub mod chain;
pub mod ownership;
pub mod validation;

pub use block::*;
pub use chain::*;
pub use ownership::*;
pub use validation::*;
