pub mod allocator;

pub use allocator::{next_free_port, PortAssigner, MAX_PORT};
