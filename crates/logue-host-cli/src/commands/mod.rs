//! Subcommands and the exit-code contract.
//!
//! | code | meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | any other failure (I/O, arguments, configuration) |
//! | 2 | the unit produced NaN or infinite samples |
//! | 3 | the unit could not be loaded |
//! | 4 | the unit rejected init |

pub mod info;
pub mod run;

use std::process::ExitCode;

use logue_host::LoadError;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_NONFINITE: u8 = 2;
pub const EXIT_LOAD: u8 = 3;
pub const EXIT_INIT: u8 = 4;

/// How a subcommand finished when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NonFiniteOutput,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::NonFiniteOutput => ExitCode::from(EXIT_NONFINITE),
        }
    }
}

pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    ExitCode::from(classify(err))
}

fn classify(err: &anyhow::Error) -> u8 {
    if let Some(host) = err.downcast_ref::<logue_host::Error>() {
        if host.as_load().is_some() {
            return EXIT_LOAD;
        }
        if host.as_init().is_some() {
            return EXIT_INIT;
        }
    }
    if err.downcast_ref::<LoadError>().is_some() {
        return EXIT_LOAD;
    }
    EXIT_FAILURE
}

/// Parses `ID=VALUE`, e.g. `3=-12`.
pub fn parse_param(s: &str) -> Result<(usize, i32), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid parameter '{s}' (expected ID=VALUE)"))?;
    let id = id
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid parameter id '{id}'"))?;
    if id >= logue_host::MAX_PARAMS {
        return Err(format!("parameter id {id} out of range (0-23)"));
    }
    let value = value
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("invalid parameter value '{value}'"))?;
    Ok((id, value))
}
