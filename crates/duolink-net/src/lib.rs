// Transport adapter seam for the Duolink coordinator.

pub mod adapter;
pub mod memory;

pub use adapter::{TransportCommand, TransportEvent, TransportHandle};
pub use memory::MemoryNetwork;
