//! End-to-end tests for the match pipeline against an in-memory provider.

mod inference;
mod mock_provider;
mod pipeline;
