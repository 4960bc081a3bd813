//! Test utilities for BatchDB integration tests
//!
//! Every test builds its own [`test_fixture::TestFixture`] so tests share no
//! store state.

#![allow(dead_code)]

pub mod test_fixture;
