//! Solve requests and the solver they are sent to.

pub mod client;
pub mod request;

pub use client::{ExportRequest, HttpSolverClient, SolverOracle};
pub use request::{PartBody, PinSet, RequestPart, SolveRequest, SolveRequestBuilder, TimeLimit};
