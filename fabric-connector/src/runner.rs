// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::fmt::Debug;
use std::process::{Command, Stdio};

use log::debug;

use crate::error::{Error, Result};

/// Executes an external binary, like `cryptogen` or `configtxgen`. The first
/// argument is the command name, the second the list of args to pass to it
/// and the last the extra environment of the child process.
pub trait CommandExecuter: Send + Sync {
    fn exec(&self, cmd: &str, args: &[String], envs: &[(String, String)]) -> Result<Vec<u8>>;
}

impl Debug for dyn CommandExecuter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommandExecuter")
    }
}

/// Runs commands as child processes of the current one.
#[derive(Debug, Default)]
pub struct Runner;

impl CommandExecuter for Runner {
    /// Returns the standard output of the command when it exits with status
    /// 0, otherwise its standard error wrapped in
    /// [`Error::CommandExecution`].
    fn exec(&self, cmd: &str, args: &[String], envs: &[(String, String)]) -> Result<Vec<u8>> {
        let command = command_line(cmd, args);
        debug!("Executing `{command}`");

        let output = Command::new(cmd)
            .args(args)
            .envs(envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .output()
            .map_err(Error::io(format!("spawn `{command}`")))?;

        if !output.status.success() {
            return Err(Error::CommandExecution {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

pub(crate) fn command_line(cmd: &str, args: &[String]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
