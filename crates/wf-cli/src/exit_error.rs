// SPDX-License-Identifier: MIT

//! Error type that carries a process exit code, so commands can return it
//! instead of calling `std::process::exit` directly and `main` decides how
//! the process actually terminates.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<reqwest::Error> for ExitError {
    fn from(e: reqwest::Error) -> Self {
        ExitError::new(1, format!("request failed: {e}"))
    }
}
