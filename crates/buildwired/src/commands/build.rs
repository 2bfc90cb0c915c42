//! Executors for the build commands.

use buildwire_protocol::RunBuild;

use super::{CommandError, CommandOutput};
use crate::project::Project;

pub(super) fn run_target(project: &Project, target: &str) -> Result<CommandOutput, CommandError> {
    project
        .execute_target(target)
        .map_err(|source| CommandError::Target {
            target: target.to_owned(),
            source,
        })?;
    Ok(CommandOutput::default())
}

pub(super) fn run_build(project: &Project, build: &RunBuild) -> Result<CommandOutput, CommandError> {
    project
        .run_sub_build(build)
        .map_err(|source| CommandError::SubBuild { source })?;
    Ok(CommandOutput::default())
}
