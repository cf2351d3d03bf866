use crate::signal::{Generator, ParameterError, SineParameters};
use std::f64::consts::PI;

/// Divisor turning the microsecond timestamp into the time fed to the sine phase.
///
/// Timestamps are in microseconds but the phase divides them by one thousand, not one
/// million. Callers calibrate their frequencies against this exact scaling, so a 1 Hz sine
/// repeats every 1000 microseconds.
pub const SINE_TIME_DIVISOR: f64 = 1.0e3;

/// Replaces the whole parameter set of a sinusoid. No value is rejected.
pub fn configure_sine(
    parameters: &mut SineParameters,
    amplitude: i32,
    frequency: f64,
    offset: i32,
) {
    *parameters = SineParameters::new(amplitude, frequency, offset);
}

/// `offset + amplitude * sin(2π · frequency · t / 1000)`, truncated toward zero.
pub fn evaluate_sine(parameters: &SineParameters, t: u64) -> i32 {
    let phase = 2.0 * PI * parameters.get_frequency() * t as f64 / SINE_TIME_DIVISOR;

    (f64::from(parameters.get_offset()) + f64::from(parameters.get_amplitude()) * phase.sin())
        as i32
}

/// The sine generator produces a pure tone around an offset. It is the simplest signal for
/// identifying the frequency response of a system one frequency at a time.
///
/// # Usage
/// To generate a **new sine generator**, use the [SineBuilder] or `SineGenerator::default()`.
///
/// To **change the behaviour** of an instance, call [configure](fn@SineGenerator::configure).
///
/// # Parameters
/// * **Amplitude (A)**: peak deviation from the offset, in the unit of the consumer.
/// * **Frequency (f)**: in Hz. Zero gives a constant output, a negative frequency inverts
/// the wave.
/// * **Offset (O)**: value around which the signal oscillates.
///
/// # Behaviour
/// `x = O + A * sin(2π * f * t / 1000)`
///
/// Where `t` is the elapsed time in microseconds. The result is truncated toward zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SineGenerator {
    parameters: SineParameters,
    /// Name of the generator (debugging)
    name: String,
}

impl Default for SineGenerator {
    fn default() -> Self {
        Self {
            parameters: SineParameters::default(),
            name: "Sine".to_string(),
        }
    }
}

impl Generator for SineGenerator {
    fn evaluate(&self, t: u64) -> i32 {
        evaluate_sine(&self.parameters, t)
    }

    fn get_name(&self) -> String {
        self.name.to_string()
    }
}

impl SineGenerator {
    pub fn configure(&mut self, amplitude: i32, frequency: f64, offset: i32) {
        configure_sine(&mut self.parameters, amplitude, frequency, offset);
    }

    pub fn set_parameters(&mut self, parameters: SineParameters) {
        self.parameters = parameters;
    }

    pub fn get_parameters(&self) -> &SineParameters {
        &self.parameters
    }
}

/// The [SineBuilder] is the proper way of generating a [SineGenerator] with a name or with
/// checked values.
/// # Usage
/// ```rust
/// use sysid_signals::bundled_signals::SineBuilder;
///
/// let sine = SineBuilder::new() // 100 counts at 2 Hz around 512
///     .with_amplitude(100)
///     .with_frequency(2.0)
///     .with_offset(512)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct SineBuilder {
    amplitude: Option<i32>,
    frequency: Option<f64>,
    offset: Option<i32>,
    name: Option<String>,
}

impl SineBuilder {
    /// Sets the defaults for the sine (silent, 0 Hz, no offset).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_amplitude(mut self, amplitude: i32) -> Self {
        self.amplitude = Some(amplitude);
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn with_offset(mut self, offset: i32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Tries to generate a [SineGenerator] from the given configuration.
    ///
    /// # Expected errors
    /// * Frequency is NaN or infinite.
    pub fn build(self) -> Result<SineGenerator, ParameterError> {
        let parameters = SineParameters::new(
            self.amplitude.unwrap_or(0),
            self.frequency.unwrap_or(0.0),
            self.offset.unwrap_or(0),
        );
        parameters.validate()?;

        let name = match self.name {
            Some(name) => format!("{} {}", name, "Sine"),
            None => "Sine".to_string(),
        };

        Ok(SineGenerator { parameters, name })
    }
}
