pub mod diff;
pub mod extract;
pub mod highlights;
pub mod outline;
pub mod pipeline;
pub mod resolver;
pub mod store;
