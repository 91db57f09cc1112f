// Test modules for policy-llm crate
//
// Each source module has a corresponding test file that focuses on
// business logic verification. HTTP-level behaviour of the adapters is
// covered by the wiremock integration tests under tests/.

// Shared fixtures and adapter doubles
pub mod helpers;

pub mod messages;
pub mod providers;
