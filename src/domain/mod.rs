pub mod account;
pub mod chain;
pub mod connectivity;
pub mod errors;
pub mod event;
pub mod task;

pub use account::*;
pub use chain::*;
pub use connectivity::*;
pub use event::*;
pub use task::*;
