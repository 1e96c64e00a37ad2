pub(crate) mod dto;
pub(crate) mod providers_controller;
pub(crate) mod telemetry_controller;
