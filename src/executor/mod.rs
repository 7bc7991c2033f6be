pub mod payload;
pub mod request_executor;
pub mod transport;

pub use request_executor::RequestExecutor;
pub use transport::{HttpTransport, ReqwestTransport, TransportError, TransportResponse};
