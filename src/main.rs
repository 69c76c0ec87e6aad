//! wintts main entry point
//!
//! Small console front end over the synthesis supervisor. One-shot mode
//! speaks its arguments and waits for completion; interactive mode reads
//! lines from stdin and speaks each one, pre-empting the previous
//! utterance.

use log::{error, info};
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::mpsc::{Receiver, TryRecvError};
use wintts::config::Config;
use wintts::supervisor::{Supervisor, SynthesisEvent, SynthesisRequest, POWERSHELL_ARGS};
use wintts::voice::VoiceSelector;
use wintts::Result;

fn main() {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().skip(1).collect();
    let debug_mode = args.iter().any(|arg| arg == "--debug" || arg == "-d");

    // Initialize logger
    if debug_mode {
        // Debug mode: write to wintts.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("wintts.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open wintts.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "wintts version {} starting (debug mode, logging to wintts.log)",
            wintts::VERSION
        );
    } else {
        // Normal mode: minimal logging to stderr, only errors
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }

    // Run the application
    if let Err(e) = run(args) {
        error!("Fatal error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn print_usage() {
    println!("Usage: wintts [OPTIONS] [TEXT...]");
    println!();
    println!("Speak TEXT through the Windows SAPI engine, or read lines from");
    println!("stdin when no TEXT is given.");
    println!();
    println!("Options:");
    println!("  --voice NAME    Voice to use (chinese-female, english-female, english-male)");
    println!("  --list-voices   Print the installed voices and exit");
    println!("  -d, --debug     Verbose logging to wintts.log");
    println!("  -h, --help      Show this help");
}

fn run(args: Vec<String>) -> Result<()> {
    let mut list_voices = false;
    let mut voice_arg: Option<String> = None;
    let mut text_args: Vec<String> = Vec::new();

    let mut iter = args
        .into_iter()
        .filter(|arg| arg != "--debug" && arg != "-d");
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--list-voices" => list_voices = true,
            "--voice" => voice_arg = iter.next(),
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            _ => text_args.push(arg),
        }
    }

    // Load configuration and build the supervisor
    let config = Config::load()?;
    info!("Config loaded from {}", config.path().display());

    let (mut supervisor, events) = match config.powershell_override() {
        Some(path) => {
            info!("Using configured interpreter: {}", path);
            Supervisor::with_command(path, POWERSHELL_ARGS.iter().copied())
        }
        None => Supervisor::new()?,
    };
    supervisor.set_volume(config.volume());
    supervisor.set_rate(config.rate());

    let voice = voice_arg
        .map(|name| VoiceSelector::parse(&name))
        .unwrap_or_else(|| config.voice());
    supervisor.select_voice(voice);

    if list_voices {
        // One-shot enumeration; a failure here is not fatal, the list
        // is simply unavailable
        match supervisor.list_voices() {
            Ok(voices) if voices.is_empty() => println!("No voices installed."),
            Ok(voices) => {
                for v in voices {
                    println!("{} | Gender: {}", v.name, v.gender);
                }
            }
            Err(e) => {
                error!("{}", e);
                eprintln!("Could not enumerate voices: {}", e);
            }
        }
        return Ok(());
    }

    if !text_args.is_empty() {
        // One-shot mode: speak and wait for the completion signal
        let text = text_args.join(" ");
        supervisor.submit(SynthesisRequest::new(supervisor.voice(), text))?;
        let _ = events.recv();
        return Ok(());
    }

    interactive(supervisor, events)
}

/// Interactive mode: one utterance per stdin line
///
/// A new line pre-empts whatever is still speaking. `/stop` silences,
/// `/voice` switches voice, EOF exits (teardown kills any live process).
fn interactive(mut supervisor: Supervisor, events: Receiver<SynthesisEvent>) -> Result<()> {
    println!("wintts {} ready", wintts::VERSION);
    println!("Voice: {}", supervisor.voice().sapi_name());
    println!("Type text to speak it. Commands: /stop, /voice NAME, /voices, /quit");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        drain_events(&events);

        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim_end();

        if let Some(rest) = line.strip_prefix('/') {
            let mut parts = rest.splitn(2, ' ');
            match (parts.next().unwrap_or(""), parts.next()) {
                ("quit", _) | ("exit", _) => break,
                ("stop", _) => {
                    if !supervisor.stop() {
                        println!("Nothing is playing.");
                    }
                }
                ("voice", Some(name)) => {
                    let voice = name
                        .parse::<usize>()
                        .map(VoiceSelector::from_index)
                        .unwrap_or_else(|_| VoiceSelector::parse(name));
                    supervisor.select_voice(voice);
                    println!("Voice: {}", voice.sapi_name());
                }
                ("voice", None) => println!("Voice: {}", supervisor.voice().sapi_name()),
                ("voices", _) => match supervisor.list_voices() {
                    Ok(voices) => {
                        for v in voices {
                            println!("{} | Gender: {}", v.name, v.gender);
                        }
                    }
                    Err(e) => println!("Could not enumerate voices: {}", e),
                },
                (cmd, _) => println!("Unknown command: /{}", cmd),
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        let request = SynthesisRequest::new(supervisor.voice(), line);
        if let Err(e) = supervisor.submit(request) {
            println!("Rejected: {}", e);
        }
    }

    // Dropping the supervisor stops any synthesis still running
    Ok(())
}

/// Report completion signals that arrived since the last prompt
fn drain_events(events: &Receiver<SynthesisEvent>) {
    loop {
        match events.try_recv() {
            Ok(SynthesisEvent::Finished { stopped: false }) => {
                println!("[synthesis finished]");
            }
            Ok(SynthesisEvent::Finished { stopped: true }) => {
                println!("[synthesis stopped]");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
}
