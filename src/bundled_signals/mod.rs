mod chirp;
mod sine;

pub use chirp::{configure_chirp, evaluate_chirp, ChirpBuilder, ChirpGenerator};
pub use sine::{configure_sine, evaluate_sine, SineBuilder, SineGenerator, SINE_TIME_DIVISOR};

pub mod prelude {
    pub use crate::bundled_signals::chirp::{ChirpBuilder, ChirpGenerator};
    pub use crate::bundled_signals::sine::{SineBuilder, SineGenerator};
    pub use crate::signal::Generator;
}
