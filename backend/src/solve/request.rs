//! Assembly of solve requests.
//!
//! A request is an ordered list of named parts that maps one-to-one onto the
//! multipart form sent to the solver. Part order is fixed:
//!
//! 1. the upload slots that are present, in [`UploadSlot::ALL`] order
//! 2. `weightages`
//! 3. `pinned_mcrs`
//! 4. `max_time_in_minutes`
//! 5. `posting_balancing_deviation` (only when non-empty)
//! 6. `previous_response` (only for pinned re-solves)
//!
//! so the same inputs always produce the same bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::deviation::DeviationMap;
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::{ScheduleResult, UploadBundle, WeightageConfig};

pub const FIELD_WEIGHTAGES: &str = "weightages";
pub const FIELD_PINNED_MCRS: &str = "pinned_mcrs";
pub const FIELD_MAX_TIME: &str = "max_time_in_minutes";
pub const FIELD_DEVIATIONS: &str = "posting_balancing_deviation";
pub const FIELD_PREVIOUS_RESPONSE: &str = "previous_response";

/// Residents whose current assignments a re-solve must keep.
///
/// Kept sorted so the serialized list is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinSet(BTreeSet<String>);

impl PinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the pin of `mcr`, returning whether it is pinned afterwards.
    pub fn toggle(&mut self, mcr: &str) -> bool {
        if self.0.remove(mcr) {
            false
        } else {
            self.0.insert(mcr.to_string());
            true
        }
    }

    pub fn contains(&self, mcr: &str) -> bool {
        self.0.contains(mcr)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PinSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Solver time limit in whole minutes, at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeLimit(NonZeroU32);

impl TimeLimit {
    pub const DEFAULT_MINUTES: u32 = 20;

    pub fn minutes(minutes: u32) -> WorkspaceResult<Self> {
        NonZeroU32::new(minutes)
            .map(Self)
            .ok_or_else(|| WorkspaceError::validation("Solver time limit must be at least 1 minute"))
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl Default for TimeLimit {
    fn default() -> Self {
        Self(NonZeroU32::MIN.saturating_add(Self::DEFAULT_MINUTES - 1))
    }
}

impl FromStr for TimeLimit {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let minutes: u32 = s.trim().parse().map_err(|_| {
            WorkspaceError::validation(format!("Invalid solver time limit '{}'", s.trim()))
        })?;
        Self::minutes(minutes)
    }
}

impl TryFrom<u32> for TimeLimit {
    type Error = WorkspaceError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::minutes(value)
    }
}

impl From<TimeLimit> for u32 {
    fn from(limit: TimeLimit) -> Self {
        limit.get()
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Body of one request part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    File { file_name: String, bytes: Vec<u8> },
    Text(String),
}

impl PartBody {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PartBody::Text(text) => Some(text),
            PartBody::File { .. } => None,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            PartBody::File { bytes, .. } => bytes,
            PartBody::Text(text) => text.as_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPart {
    pub name: String,
    pub body: PartBody,
}

/// A transport-ready solve request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveRequest {
    parts: Vec<RequestPart>,
}

impl SolveRequest {
    pub fn parts(&self) -> &[RequestPart] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&RequestPart> {
        self.parts.iter().find(|p| p.name == name)
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.part(name).and_then(|p| p.body.as_text())
    }

    /// Resident ids the solver is asked to hold fixed.
    pub fn pinned_mcrs(&self) -> WorkspaceResult<Vec<String>> {
        let text = self.text(FIELD_PINNED_MCRS).unwrap_or("[]");
        Ok(serde_json::from_str(text)?)
    }

    /// The prior result attached to a pinned re-solve.
    pub fn previous_response(&self) -> WorkspaceResult<Option<ScheduleResult>> {
        self.text(FIELD_PREVIOUS_RESPONSE)
            .map(serde_json::from_str::<ScheduleResult>)
            .transpose()
            .map_err(Into::into)
    }

    /// Canonical byte encoding: name, kind, file name and body of each part,
    /// each length-prefixed.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            push_chunk(&mut out, part.name.as_bytes());
            match &part.body {
                PartBody::File { file_name, .. } => {
                    push_chunk(&mut out, b"file");
                    push_chunk(&mut out, file_name.as_bytes());
                }
                PartBody::Text(_) => push_chunk(&mut out, b"text"),
            }
            push_chunk(&mut out, part.body.bytes());
        }
        out
    }

    /// SHA-256 of [`canonical_bytes`](Self::canonical_bytes), hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        hex::encode(hasher.finalize())
    }

    /// Convert into a multipart form for `reqwest`.
    pub fn into_multipart(self) -> WorkspaceResult<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.parts {
            form = match part.body {
                PartBody::File { file_name, bytes } => {
                    let file = reqwest::multipart::Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str("text/csv")?;
                    form.part(part.name, file)
                }
                PartBody::Text(text) => form.text(part.name, text),
            };
        }
        Ok(form)
    }
}

fn push_chunk(out: &mut Vec<u8>, chunk: &[u8]) {
    out.extend_from_slice(&(chunk.len() as u64).to_be_bytes());
    out.extend_from_slice(chunk);
}

/// Builds a [`SolveRequest`] from the current workspace inputs.
///
/// The builder decides only whether to attach the prior result. Holding the
/// pinned residents fixed is the solver's job.
#[derive(Debug, Clone)]
pub struct SolveRequestBuilder<'a> {
    uploads: &'a UploadBundle,
    weightages: &'a WeightageConfig,
    pins: &'a PinSet,
    time_limit: TimeLimit,
    prior: Option<&'a ScheduleResult>,
    deviations: Option<&'a DeviationMap>,
}

impl<'a> SolveRequestBuilder<'a> {
    pub fn new(
        uploads: &'a UploadBundle,
        weightages: &'a WeightageConfig,
        pins: &'a PinSet,
        time_limit: TimeLimit,
    ) -> Self {
        Self {
            uploads,
            weightages,
            pins,
            time_limit,
            prior: None,
            deviations: None,
        }
    }

    pub fn prior_result(mut self, prior: Option<&'a ScheduleResult>) -> Self {
        self.prior = prior;
        self
    }

    pub fn deviations(mut self, deviations: &'a DeviationMap) -> Self {
        self.deviations = Some(deviations);
        self
    }

    /// Whether the built request will carry the prior result.
    pub fn attaches_prior(&self) -> bool {
        !self.pins.is_empty() && self.prior.is_some()
    }

    pub fn build(&self) -> WorkspaceResult<SolveRequest> {
        let mut parts = Vec::with_capacity(10);

        for (slot, file) in self.uploads.iter() {
            parts.push(RequestPart {
                name: slot.field_name().to_string(),
                body: PartBody::File {
                    file_name: file.file_name.clone(),
                    bytes: file.bytes.clone(),
                },
            });
        }

        parts.push(text_part(FIELD_WEIGHTAGES, serde_json::to_string(self.weightages)?));
        parts.push(text_part(FIELD_PINNED_MCRS, serde_json::to_string(self.pins)?));
        parts.push(text_part(FIELD_MAX_TIME, self.time_limit.to_string()));

        if let Some(deviations) = self.deviations.filter(|d| !d.is_empty()) {
            parts.push(text_part(FIELD_DEVIATIONS, serde_json::to_string(deviations)?));
        }

        if self.attaches_prior() {
            if let Some(prior) = self.prior {
                parts.push(text_part(FIELD_PREVIOUS_RESPONSE, serde_json::to_string(prior)?));
            }
        }

        Ok(SolveRequest { parts })
    }
}

fn text_part(name: &str, text: String) -> RequestPart {
    RequestPart {
        name: name.to_string(),
        body: PartBody::Text(text),
    }
}
