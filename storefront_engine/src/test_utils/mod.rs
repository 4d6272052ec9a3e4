//! Helpers shared by the engine's integration tests, the BDD suite and the server's endpoint tests.
mod fake_gateway;
pub mod prepare_env;
pub mod webhooks;

pub use fake_gateway::FakeGateway;
