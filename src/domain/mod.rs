// Domain layer: payload and outcome types, the API error schema, and the ports the core runs on.

pub mod api_error;
pub mod correction;
pub mod model;
pub mod ports;
pub mod registration;
pub mod status;
