//! Test suites for the build command server.

pub(crate) mod support;
mod unit;
