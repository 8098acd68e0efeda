// Domain layer: core models and ports (interfaces) for the installation pipeline.

pub mod model;
pub mod ports;
