pub mod extract;
pub mod load;
pub mod orchestrator;
pub mod transform;
