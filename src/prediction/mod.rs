pub mod aggregation_window;
pub mod delivery_throttle;
pub mod wire_codec;
