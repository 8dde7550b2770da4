mod builder;
mod descriptor;
mod http_client;
mod manager;

// 重新导出公共API
pub use builder::CommunicationManagerBuilder;
pub use descriptor::{CallDescriptor, ServiceResponse};
pub use http_client::{create_http_client, Credential, HttpTransport, Transport, TransportRequest};
pub use manager::CommunicationManager;

pub(crate) use http_client::apply_header_ops;
