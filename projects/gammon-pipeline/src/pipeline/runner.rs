use crate::pipeline::error::PipelineError;
use crate::pipeline::types::StageCommand;
use std::process::{Command, ExitStatus};

/// Runs a stage command to completion and reports its exit code.
pub trait CommandRunner {
    fn run(&mut self, command: &StageCommand) -> Result<i32, PipelineError>;
}

/// Spawns real processes with inherited stdio, blocking until each exits.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &StageCommand) -> Result<i32, PipelineError> {
        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .map_err(|source| PipelineError::Spawn {
                stage: command.stage,
                program: command.program.clone(),
                source,
            })?;
        Ok(exit_code(status))
    }
}

/// Shell convention: a process killed by signal N reports 128 + N.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
