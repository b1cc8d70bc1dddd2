use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Provisioning,
    Running,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }

    pub fn advance(self, succeeded: bool) -> Self {
        match (self, succeeded) {
            (PipelineState::Start, _) => PipelineState::Provisioning,
            (PipelineState::Provisioning, true) => PipelineState::Running,
            (PipelineState::Running, true) => PipelineState::Done,
            (PipelineState::Provisioning | PipelineState::Running, false) => PipelineState::Aborted,
            (terminal, _) => terminal,
        }
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Start => "start",
            PipelineState::Provisioning => "provisioning",
            PipelineState::Running => "running",
            PipelineState::Done => "done",
            PipelineState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}
