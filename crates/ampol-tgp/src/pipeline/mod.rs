mod command;
mod state;

pub use command::{CommandChain, CommandError, CommandSpec};
pub use state::PipelineState;

use std::path::{Path, PathBuf};

use crate::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Provisioning failed: {0}")]
    Provisioning(#[source] CommandError),
    #[error("Run failed: {0}")]
    Run(#[source] CommandError),
}

impl PipelineError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Provisioning(e) | PipelineError::Run(e) => e.exit_code(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Provisioner {
    installer: CommandSpec,
    manifest: PathBuf,
}

impl Provisioner {
    pub fn new(installer: CommandSpec, manifest: impl Into<PathBuf>) -> Self {
        Self {
            installer,
            manifest: manifest.into(),
        }
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    pub fn command(&self) -> CommandSpec {
        self.installer.clone().arg(&self.manifest)
    }

    pub fn provision(&self) -> Result<(), PipelineError> {
        let command = self.command();
        log::debug!("Provisioning dependencies: {}", command);
        CommandChain::single(command)
            .run()
            .map_err(PipelineError::Provisioning)
    }
}

#[derive(Debug, Clone)]
pub struct TaskRunner {
    chain: CommandChain,
}

impl TaskRunner {
    pub fn new(chain: CommandChain) -> Self {
        Self { chain }
    }

    pub fn run(&self) -> Result<(), PipelineError> {
        log::debug!("Running: {}", self.chain);
        self.chain.run().map_err(PipelineError::Run)
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    provisioner: Provisioner,
    runner: TaskRunner,
}

impl Pipeline {
    pub fn new(provisioner: Provisioner, runner: TaskRunner) -> Self {
        Self {
            provisioner,
            runner,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, CommandError> {
        let installer = CommandSpec::from_argv(&settings.provision.installer)?;
        let stages = settings
            .run
            .stages
            .iter()
            .map(|argv| CommandSpec::from_argv(argv))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            Provisioner::new(installer, &settings.provision.manifest),
            TaskRunner::new(CommandChain::new(stages)?),
        ))
    }

    pub fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    pub fn run(&self) -> Result<(), PipelineError> {
        let mut state = PipelineState::Start;
        let mut failure = None;

        while !state.is_terminal() {
            let result = match state {
                PipelineState::Start => Ok(()),
                PipelineState::Provisioning => self.provisioner.provision(),
                PipelineState::Running => self.runner.run(),
                PipelineState::Done | PipelineState::Aborted => break,
            };

            let next = state.advance(result.is_ok());
            log::debug!("Pipeline {} -> {}", state, next);
            if let Err(e) = result {
                log::error!("{}", e);
                failure = Some(e);
            }
            state = next;
        }

        failure.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioner_appends_manifest() {
        let provisioner = Provisioner::new(
            CommandSpec::from_argv(&["pip", "install", "-r"]).unwrap(),
            "requirements.txt",
        );

        assert_eq!(
            provisioner.command().to_string(),
            "pip install -r requirements.txt"
        );
    }

    #[test]
    fn test_from_default_settings() {
        let pipeline = Pipeline::from_settings(&Settings::default()).unwrap();

        assert_eq!(
            pipeline.provisioner().command().to_string(),
            "pip install -r requirements.txt"
        );
        assert_eq!(pipeline.runner().chain.to_string(), "python scrape.py");
    }

    #[test]
    fn test_error_exit_code_is_the_step_status() {
        let err = PipelineError::Run(CommandError::Exited {
            command: "python scrape.py".into(),
            code: 4,
        });
        assert_eq!(err.exit_code(), 4);
    }
}
