//! Shared test utilities for HTTP-level tests.
