//! Use cases orchestrating the deliberation and chat pipelines.

pub mod rewrite_query;
pub mod run_chat;
pub mod run_council;
pub mod send_message;
