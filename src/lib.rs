pub mod clock;
pub mod export;
pub mod params;
pub mod recorder;
pub mod simulation;
pub mod source;
pub mod streamer;

mod sample_buffer;
mod spike_detector;
mod types;
mod util;
