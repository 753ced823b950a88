//! Integration tests for chat-dispatch.

pub mod args_test;
pub mod binary_test;
pub mod common;
pub mod dispatch_test;
