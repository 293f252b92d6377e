//! Domain types and pure logic for RunningHub-backed media tools.
//!
//! Everything here is synchronous and free of I/O: media validation,
//! job parameters, the job state machine, poll policies, progress
//! curves and the tool catalogue. The HTTP adapter and the async
//! polling engine live in `mediagen-runninghub`.

pub mod error;
pub mod job;
pub mod media;
pub mod params;
pub mod polling;
pub mod progress;
pub mod tools;
pub mod types;
