pub mod agent;
pub mod probe;
