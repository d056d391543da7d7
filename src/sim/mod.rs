// src/sim/mod.rs - Local stand-ins for the remote side
pub mod job_server;

pub use job_server::{sample_gcode, FinishRecord, JobServer, JobServerState};
