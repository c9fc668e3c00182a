pub mod clock_ring;
pub mod ghost_list;
pub mod intrusive_list;
pub mod node_arena;

pub use clock_ring::ClockRing;
pub use ghost_list::GhostList;
pub use intrusive_list::IntrusiveList;
pub use node_arena::{NodeArena, NodeId};
