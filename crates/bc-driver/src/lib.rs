//! bc-driver: Test driver discovering dial-back agents
//!
//! The driver advertises a rendezvous listener, waits for launched
//! applications to announce their callback address through an in-process
//! agent, and then drives each application through remote calls until it
//! exits.

pub mod driver;
pub mod registry;
pub mod remote;
pub mod resolver;
pub mod server;
pub mod shutdown;

pub use driver::Driver;
pub use registry::AgentRegistry;
pub use resolver::AddressResolver;
pub use shutdown::ShutdownWatcher;
