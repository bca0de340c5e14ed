// Domain layer: plain data and the ports (traits) the pipeline is written against.

pub mod model;
pub mod ports;
