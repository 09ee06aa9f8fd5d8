//! The `CheckBackend` abstraction (spec.md §4.5, C5) and its four
//! implementations: in-memory `Mock`, Kubernetes-backed `Orchestrator`,
//! HTTP-delegating `Remote`, and the fan-out `Aggregator`. Also the outbound
//! JSON:API client (C8) the `Remote` backend is built on.

pub mod aggregator;
pub mod hooks;
pub mod interface;
pub mod mock;
pub mod orchestrator;
pub mod remote;

pub use aggregator::AggregatorBackend;
pub use interface::{CheckBackend, CheckStream};
pub use mock::MockBackend;
pub use orchestrator::OrchestratorBackend;
pub use remote::{RemoteBackend, RemoteClient};
