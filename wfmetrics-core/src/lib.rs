pub mod assembly;
pub mod client_ip;
pub mod error;
pub mod instrumentation;
pub mod observer;
pub mod request;
pub mod scope;
pub mod settings;
pub mod sink;
pub mod timing;
pub mod wrap;

pub use instrumentation::Instrumentation;
