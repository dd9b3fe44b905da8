pub mod tools;
pub mod workflows;

use engine::WorkflowService;

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub service: WorkflowService,
}

impl AppState {
    pub fn new(service: WorkflowService) -> Self {
        Self { service }
    }
}
