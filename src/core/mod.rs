mod error;
mod resource_store;
mod simulation;
mod tick;

pub use error::ConfigError;
pub use resource_store::{BestTracker, Resource, ResourceInfo, ResourceStore};
pub use simulation::Simulation;
pub use tick::{SubscriptionId, TickBus, TickCallback, TickHandler, UPDATE_EVENT};
