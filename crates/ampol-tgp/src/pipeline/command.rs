use std::ffi::{OsStr, OsString};
use std::fmt::Display;
use std::io;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("No program given")]
    EmptyCommand,
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to wait for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with status {code}")]
    Exited { command: String, code: i32 },
    #[error("`{command}` was terminated by signal {signal}")]
    Signaled { command: String, signal: i32 },
}

impl CommandError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::EmptyCommand => 2,
            CommandError::Spawn { source, .. } => match source.kind() {
                io::ErrorKind::PermissionDenied => 126,
                _ => 127,
            },
            CommandError::Wait { .. } => 1,
            CommandError::Exited { code, .. } => *code,
            CommandError::Signaled { signal, .. } => 128 + signal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn from_argv<S: AsRef<OsStr>>(argv: &[S]) -> Result<Self, CommandError> {
        let (program, args) = argv.split_first().ok_or(CommandError::EmptyCommand)?;
        if program.as_ref().is_empty() {
            return Err(CommandError::EmptyCommand);
        }
        Ok(Self::new(program.as_ref()).args(args))
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    fn check(&self, status: ExitStatus) -> Result<(), CommandError> {
        if status.success() {
            return Ok(());
        }
        if let Some(code) = status.code() {
            return Err(CommandError::Exited {
                command: self.to_string(),
                code,
            });
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Err(CommandError::Signaled {
                    command: self.to_string(),
                    signal,
                });
            }
        }
        Err(CommandError::Exited {
            command: self.to_string(),
            code: 1,
        })
    }
}

impl Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Commands joined by pipes. Any failing stage fails the chain, reporting the
/// status of the rightmost failing stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandChain {
    stages: Vec<CommandSpec>,
}

impl CommandChain {
    pub fn new(stages: Vec<CommandSpec>) -> Result<Self, CommandError> {
        if stages.is_empty() {
            return Err(CommandError::EmptyCommand);
        }
        Ok(Self { stages })
    }

    pub fn single(stage: CommandSpec) -> Self {
        Self {
            stages: vec![stage],
        }
    }

    pub fn stages(&self) -> &[CommandSpec] {
        &self.stages
    }

    pub fn run(&self) -> Result<(), CommandError> {
        let last = self.stages.len() - 1;
        let mut children: Vec<(&CommandSpec, Child)> = Vec::with_capacity(self.stages.len());
        let mut upstream: Option<ChildStdout> = None;

        for (i, spec) in self.stages.iter().enumerate() {
            let mut command = spec.to_command();
            if let Some(stdout) = upstream.take() {
                command.stdin(Stdio::from(stdout));
            }
            if i < last {
                command.stdout(Stdio::piped());
            }

            log::debug!("Spawning `{}`", spec);
            match command.spawn() {
                Ok(mut child) => {
                    upstream = child.stdout.take();
                    children.push((spec, child));
                }
                Err(source) => {
                    // Close our end of the pipe so upstream stages can finish.
                    drop(command);
                    let _ = wait_all(children);
                    return Err(CommandError::Spawn {
                        command: spec.to_string(),
                        source,
                    });
                }
            }
        }

        wait_all(children)
    }
}

impl Display for CommandChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}

fn wait_all(children: Vec<(&CommandSpec, Child)>) -> Result<(), CommandError> {
    let mut failure = None;
    for (spec, mut child) in children {
        let outcome = match child.wait() {
            Ok(status) => spec.check(status),
            Err(source) => Err(CommandError::Wait {
                command: spec.to_string(),
                source,
            }),
        };
        if let Err(e) = outcome {
            log::debug!("Stage failed: {}", e);
            failure = Some(e);
        }
    }
    failure.map_or(Ok(()), Err)
}
