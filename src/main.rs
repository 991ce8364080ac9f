use clap::Parser;
use std::fmt::Display;
use std::time::Duration;
use surfacesyncrs::{
    cli::{choose_device, validate_device, Args},
    config::Settings,
    create_scheduler, create_shared_state,
    event_loop::{command_channel, control_channel, Engine, EnginePorts},
    handle_device_list,
    housekeeping::Housekeeper,
    logging,
    midi::{connect_input, connect_output, MidiSink, NullSink},
    player::{Song, SongPlayer},
    ui::StatusLine,
    Scheduler,
};

fn main() {
    initialize_logging();
    let args = Args::parse();

    if args.device_list {
        let client_name = args.client_name.as_deref().unwrap_or("surfacesyncrs");
        list_available_devices(client_name);
        return;
    }

    let settings = load_settings(&args);
    let (inputs, outputs) = handle_device_list(&settings.client_name);
    for (port, devices) in [
        (&settings.ports.input, &inputs),
        (&settings.ports.output, &outputs),
        (&settings.ports.synth, &outputs),
    ] {
        if let Some(device_name) = port {
            if let Err(error_msg) = validate_device(device_name, devices) {
                fatal(error_msg);
            }
        }
    }

    let song = match &settings.songs.initial {
        Some(path) => Song::from_file(path)
            .unwrap_or_else(|e| fatal(format!("Cannot load {}: {}", path.display(), e))),
        None => Song::empty(),
    };
    let song_name = song.name.clone();

    let scheduler = create_scheduler();
    let shared_state = create_shared_state(settings.playback.default_volume);

    let (control_tx, control_rx) = control_channel();
    let (command_tx, command_rx) = command_channel();

    // Dropping the connection closes the port, so it lives as long as main.
    let _input = settings.ports.input.as_ref().map(|device_name| {
        connect_input(&settings.client_name, device_name, control_tx)
            .unwrap_or_else(|e| fatal(format!("Error connecting to MIDI device: {}", e)))
    });

    let surface = open_sink(&settings.client_name, settings.ports.output.as_deref());
    let synth = open_sink(&settings.client_name, settings.ports.synth.as_deref());

    let mut player = SongPlayer::new(song);
    player.set_gain(settings.playback.default_volume);

    let engine = Engine::new(
        &settings,
        shared_state.clone(),
        player,
        EnginePorts {
            controls: control_rx,
            commands: command_rx,
            surface,
            synth,
        },
    );
    let evictions = engine.eviction_counter();
    let write_failures = engine.write_failure_counter();

    log::info!(
        "Starting '{}': {} frames at {} Hz",
        settings.name,
        settings.audio.block_frames,
        settings.audio.sample_rate
    );
    scheduler.spawn("block-loop", move || engine.run());

    let mut housekeeper = Housekeeper::new(
        shared_state,
        settings.songs.directory.clone(),
        command_tx,
        evictions,
        write_failures,
        StatusLine::new(),
    );
    if !song_name.is_empty() {
        housekeeper.set_current_song(song_name);
    }

    println!("Press Ctrl+C to exit...");
    housekeeper.run(Duration::from_millis(settings.housekeeping.poll_interval_ms));
}

fn initialize_logging() {
    if let Err(e) = logging::init_logger() {
        eprintln!("Logger initialization failed: {}", e);
    }
    log::info!("Application starting");
}

fn load_settings(args: &Args) -> Settings {
    let mut settings = Settings::load(&args.config).unwrap_or_else(|e| fatal(e));

    if let Some(client_name) = &args.client_name {
        settings.client_name = client_name.clone();
    }
    if let Some(songs_dir) = &args.songs_dir {
        settings.songs.directory = songs_dir.clone();
    }
    if args.choose_ports {
        let (inputs, outputs) = handle_device_list(&settings.client_name);
        let chosen = choose_device("Surface input", &inputs)
            .and_then(|input| Ok((input, choose_device("Surface output", &outputs)?)))
            .unwrap_or_else(|e| fatal(e));
        if let (Some(input), _) = &chosen {
            settings.ports.input = Some(input.clone());
        }
        if let (_, Some(output)) = chosen {
            settings.ports.output = Some(output);
        }
    }
    settings
}

fn list_available_devices(client_name: &str) {
    let (inputs, outputs) = handle_device_list(client_name);
    println!("Available MIDI inputs:");
    for device in inputs {
        println!("  - {}", device);
    }
    println!("Available MIDI outputs:");
    for device in outputs {
        println!("  - {}", device);
    }
}

fn open_sink(client_name: &str, device_name: Option<&str>) -> Box<dyn MidiSink + Send> {
    match device_name {
        Some(name) => match connect_output(client_name, name) {
            Ok(sink) => {
                log::info!("Successfully connected to MIDI device: {}", name);
                Box::new(sink)
            }
            Err(e) => fatal(format!("Error connecting to MIDI device: {}", e)),
        },
        None => Box::new(NullSink),
    }
}

fn fatal(message: impl Display) -> ! {
    log::error!("{}", message);
    eprintln!("{}", message);
    std::process::exit(1);
}
