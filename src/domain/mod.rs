mod events;
mod item;
mod ledger;
mod money;
mod order;

pub use events::*;
pub use item::*;
pub use ledger::*;
pub use money::*;
pub use order::*;
