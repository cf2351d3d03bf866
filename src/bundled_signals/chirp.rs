use crate::signal::{
    ChirpParameters, Generator, ParameterError, DEFAULT_ANGULAR_FREQUENCY, DEFAULT_CHIRP_PERIOD,
};

/// Divisor turning the wrapped microsecond timestamp into seconds inside the sweep.
const CHIRP_TIME_DIVISOR: f64 = 1.0e6;

/// Replaces the whole parameter set of a chirp and recomputes its sweep rate.
///
/// No value is rejected. A warning is logged when the parameters give a flat, infinite or
/// undefined sweep rate, but they are applied all the same.
pub fn configure_chirp(
    parameters: &mut ChirpParameters,
    amplitude: i32,
    start_freq: f64,
    stop_freq: f64,
    period: i32,
    offset: i32,
) {
    *parameters = ChirpParameters::new(amplitude, start_freq, stop_freq, period, offset);
    parameters.warn_if_degenerate();
}

/// Output of the logarithmic chirp `t` microseconds after the epoch.
///
/// `t` is first folded into the current sweep. The phase then follows
/// `w1 / alpha * (exp(alpha * t) - 1)`, whose derivative grows from `w1` to `w2` over one
/// period before jumping back to zero.
pub fn evaluate_chirp(parameters: &ChirpParameters, t: u64) -> i32 {
    let t = match parameters.period_micros() {
        Some(period) => t % period,
        None => t,
    };

    let alpha = parameters.get_alpha();
    let growth = (alpha * t as f64 / CHIRP_TIME_DIVISOR).exp() - 1.0;
    let phase = parameters.get_start_freq() / alpha * growth;

    (f64::from(parameters.get_offset()) + f64::from(parameters.get_amplitude()) * phase.sin())
        as i32
}

/// The chirp generator sweeps a sine from a start to a stop angular frequency over a fixed
/// period, then starts over.
///
/// # Usage
/// To generate a **new chirp generator**, use the [ChirpBuilder] or
/// `ChirpGenerator::default()`.
///
/// To **change the behaviour** of an instance, call [configure](fn@ChirpGenerator::configure).
///
/// # Parameters
/// * **Amplitude (A)** and **Offset (O)**: in the unit of the consumer.
/// * **Start and stop frequencies (w1, w2)**: angular frequencies in rad/s.
/// * **Period (P)**: length of one sweep, in whole seconds.
///
/// # Behaviour
/// The instantaneous frequency grows exponentially, so every decade between `w1` and `w2`
/// gets the same share of the period:
///
/// `x = O + A * sin(w1 / α * (exp(α * t) - 1))`, with `α = ln(w2 / w1) / P`
///
/// Where `t` is the time in seconds since the beginning of the current sweep. The result is
/// truncated toward zero. Nothing smooths the jump at the end of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ChirpGenerator {
    parameters: ChirpParameters,
    /// Name of the generator (debugging)
    name: String,
}

impl Default for ChirpGenerator {
    fn default() -> Self {
        Self {
            parameters: ChirpParameters::default(),
            name: "Chirp".to_string(),
        }
    }
}

impl Generator for ChirpGenerator {
    fn evaluate(&self, t: u64) -> i32 {
        evaluate_chirp(&self.parameters, t)
    }

    fn get_name(&self) -> String {
        self.name.to_string()
    }
}

impl ChirpGenerator {
    pub fn configure(
        &mut self,
        amplitude: i32,
        start_freq: f64,
        stop_freq: f64,
        period: i32,
        offset: i32,
    ) {
        configure_chirp(
            &mut self.parameters,
            amplitude,
            start_freq,
            stop_freq,
            period,
            offset,
        );
    }

    pub fn set_parameters(&mut self, parameters: ChirpParameters) {
        parameters.warn_if_degenerate();
        self.parameters = parameters;
    }

    pub fn get_parameters(&self) -> &ChirpParameters {
        &self.parameters
    }
}

/// The [ChirpBuilder] is the checked way of generating a [ChirpGenerator].
/// # Usage
/// ```rust
/// use sysid_signals::bundled_signals::ChirpBuilder;
///
/// let chirp = ChirpBuilder::new() // 1 to 100 rad/s every 20 seconds
///     .with_amplitude(50)
///     .with_start_freq(1.0)
///     .with_stop_freq(100.0)
///     .with_period(20)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct ChirpBuilder {
    amplitude: Option<i32>,
    start_freq: Option<f64>,
    stop_freq: Option<f64>,
    period: Option<i32>,
    offset: Option<i32>,
    name: Option<String>,
}

impl ChirpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_amplitude(mut self, amplitude: i32) -> Self {
        self.amplitude = Some(amplitude);
        self
    }

    /// Sets the angular frequency at the beginning of each sweep, in rad/s.
    pub fn with_start_freq(mut self, start_freq: f64) -> Self {
        self.start_freq = Some(start_freq);
        self
    }

    /// Sets the angular frequency at the end of each sweep, in rad/s.
    pub fn with_stop_freq(mut self, stop_freq: f64) -> Self {
        self.stop_freq = Some(stop_freq);
        self
    }

    /// Sets the length of a sweep, in seconds.
    pub fn with_period(mut self, period: i32) -> Self {
        self.period = Some(period);
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

    /// Tries to generate a [ChirpGenerator] from the given configuration.
    ///
    /// # Default values:
    /// * Amplitude and offset: 0
    /// * Start and stop frequencies: [DEFAULT_ANGULAR_FREQUENCY](const@DEFAULT_ANGULAR_FREQUENCY)
    /// * Period: [DEFAULT_CHIRP_PERIOD](const@DEFAULT_CHIRP_PERIOD)
    ///
    /// # Expected errors
    /// * Period not positive.
    /// * Start or stop frequency not positive.
    /// * Start and stop frequencies equal (which is the case when both are left unset).
    pub fn build(self) -> Result<ChirpGenerator, ParameterError> {
        let parameters = ChirpParameters::new(
            self.amplitude.unwrap_or(0),
            self.start_freq.unwrap_or(DEFAULT_ANGULAR_FREQUENCY),
            self.stop_freq.unwrap_or(DEFAULT_ANGULAR_FREQUENCY),
            self.period.unwrap_or(DEFAULT_CHIRP_PERIOD),
            self.offset.unwrap_or(0),
        );
        parameters.validate()?;

        let name = match self.name {
            Some(name) => format!("{} {}", name, "Chirp"),
            None => "Chirp".to_string(),
        };

        Ok(ChirpGenerator { parameters, name })
    }
}
