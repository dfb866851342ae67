pub mod core;
pub mod frame_loop;
pub mod main;
pub mod render;
pub mod run_effect;

#[cfg(test)]
mod tests;
