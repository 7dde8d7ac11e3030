//! The simulated office: agents, desks and what gets drawn over them.

pub mod agent;
pub mod annotations;
pub mod desks;
pub mod dispatcher;
pub mod layout;

pub use agent::{Agent, AgentClass, AgentState};
pub use dispatcher::{Dispatcher, DispatcherConfig, OfficeSnapshot};
pub use layout::OfficeLayout;
