// SPDX-License-Identifier: MIT

//! Explicit version tagging for forward migration (§4.1: "Each version tag
//! is explicit to allow forward migration"). Every request/response DTO is
//! wrapped in an [`Envelope`] carrying the schema version it was written
//! with; a future version can add a case to [`Envelope::upgrade`]-style
//! logic without breaking older clients.

use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    #[serde(rename = "v")]
    pub schema_version: u32,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn current(payload: T) -> Self {
        Self { schema_version: CURRENT_SCHEMA_VERSION, payload }
    }
}
