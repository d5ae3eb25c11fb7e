// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

pub mod memory_store;
pub mod recorder;
pub mod s3_mock;
pub mod socket_guard;
