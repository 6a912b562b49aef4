pub mod publish;
pub mod runner;
pub mod stage;
pub mod state;

pub use runner::WorkflowRunner;
pub use stage::Stage;
pub use state::WorkflowState;
