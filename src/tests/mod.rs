//! Integration tests for the Propgate application.
//!
//! Unit tests live next to the code they cover; the modules here exercise
//! composed behavior: the orchestrator running all pipeline stages in
//! order, and the full router with its middleware stack.
//!
//! ## Test Modules
//!
//! - **pipeline_tests**: Orchestrator stage ordering and short-circuiting
//! - **api_tests**: Full-router request/response tests
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test
//! ```
