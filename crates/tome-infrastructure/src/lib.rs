//! Infrastructure layer of the Tome client: the HTTP gateway and the wire
//! DTOs it translates through.

pub mod dto;
pub mod remote_gateway;

pub use remote_gateway::RemoteGateway;
