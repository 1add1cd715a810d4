//! Remote-call server implementation

mod dispatch;
mod listener;

pub use dispatch::{dispatch, Dispatch};
pub use listener::RpcServer;
