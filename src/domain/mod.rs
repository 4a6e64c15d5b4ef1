// Domain layer: records, booking rules and the ports the services depend on.

pub mod model;
pub mod ports;
