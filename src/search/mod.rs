//! Web search backend: SerpAPI Google results reduced to their snippets.

mod client;
mod types;

pub use client::{SearchError, SerpApiClient, SnippetSearch};
