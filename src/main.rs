use anyhow::{anyhow, Context};
use ringbuf::HeapRb;
use std::env;
use std::thread;

// DEBUGGING, LOGGING
use simplelog::__private::paris::Logger;
use simplelog::*;

// MY STUFF
use sysid_signals::profile_yaml::{load_profile, Profile};
use sysid_signals::recorder::Recorder;
use sysid_signals::signal::{Command, Injector, InjectorHandle};

const DEFAULT_PROFILE: &str = "profiles/sweep.yaml";
const DEFAULT_OUTPUT: &str = "injection.wav";

fn main() -> Result<(), anyhow::Error> {
    // LOGGER INIT
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to start simplelog")?;
    let mut logger = Logger::new();

    let mut args = env::args().skip(1);
    let profile_path = args.next().unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let output_path = args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let profile = load_profile(&profile_path)
        .with_context(|| format!("Failed to load profile {}", profile_path))?;

    #[cfg(feature = "verbose_signals")]
    warn!("<red><b>Verbose signals</> is a very <red><b>slow</> feature. I do only recommend using it on a few circumstances.");

    // RING BUFFER
    let (producer, consumer) = HeapRb::<i32>::new(profile.buffer_size).split();
    let recorder = Recorder::create(consumer, &output_path, profile.sample_rate())?;
    let (stop_tx, stop_rx) = crossbeam::channel::bounded(1);
    let recording = thread::spawn(move || recorder.run_until(stop_rx));

    // INJECTION
    let (mut injector, handle) = Injector::new("Main", profile.tick_us, producer);
    info!(
        "<b>Injecting <u>{} samples</> <b>at {} Hz</>",
        profile.total_ticks(),
        injector.get_clock().get_rate()
    );
    logger.loading("<blue><info></><b> Injecting signal</>");
    let injected = inject(&mut injector, &handle, &profile);
    logger.done();

    // The recorder must stop even when the injection failed
    stop_tx.send(()).ok();
    let recorded = recording
        .join()
        .map_err(|_| anyhow!("Recorder thread panicked"))??;
    let injected = injected?;

    info!("<b>Injected {} samples, recorded {}.</>", injected, recorded);
    info!("<green><tick></> <b>Program finished <green>successfully</>");
    Ok(())
}

/// Plays every segment of the profile through the injector.
fn inject(
    injector: &mut Injector,
    handle: &InjectorHandle,
    profile: &Profile,
) -> Result<u64, anyhow::Error> {
    let mut total = 0;

    for (index, segment) in profile.segments.iter().enumerate() {
        if let Some(parameters) = segment.sine {
            handle.send(Command::ConfigureSine(parameters))?;
        }
        if let Some(parameters) = segment.chirp {
            handle.send(Command::ConfigureChirp(parameters))?;
        }
        handle.select(segment.mix)?;

        total += injector
            .run(segment.ticks(profile.tick_us))
            .with_context(|| {
                format!("Segment {} interrupted in {}", index, injector.get_name())
            })?;
    }

    Ok(total)
}
