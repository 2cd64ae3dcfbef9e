pub mod connector;
pub mod error;
pub mod framer;
pub mod line_transport;

pub use connector::{Connector, StreamParts, TcpEndpoint};
pub use error::TransportError;
pub use framer::LineFramer;
pub use line_transport::{DisconnectReason, LineTransport};
