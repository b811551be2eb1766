pub mod classifier;
pub mod notifier;
pub mod router;
pub mod ticket;
pub mod transition;
