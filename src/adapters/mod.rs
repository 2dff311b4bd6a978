// Adapters layer: concrete transports behind the HttpTransport port.

pub mod http;
pub mod mock;
