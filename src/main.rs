use busline_tracker::data::{demo_track, demo_track_names, DEFAULT_TRACK};
use busline_tracker::processing::Stop;
use busline_tracker::{
    ConfigurationManager, EngineDriver, EntityId, GeoPoint, MockFeed, Notification, SourceMessage,
    TrackerConfig,
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Playback speed-up used when none is given
const DEFAULT_SPEEDUP: u64 = 50;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,busline_tracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn usage(program: &str) {
    eprintln!("Usage: {} [--config <file>] [--track <name>] [--speedup <factor>]", program);
    eprintln!("   or: {} --list-tracks", program);
    eprintln!("   or: {} --write-config <file>", program);
}

/// Replay a demo track against a mock upstream and print the map state
fn run_demo(config: TrackerConfig, track: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut feed = MockFeed::new();
    // One stationary bus served by the poll so the arrivals board has two rows
    feed.set_fallback_snapshot(r#"[{"bus_id":"KA-34-F-1010","latitude":15.1530,"longitude":76.9330}]"#);

    let frame_interval = config.frame_interval();
    let mut driver = EngineDriver::new(config, feed)?;
    driver.engine_mut().subscribe(Box::new(|n: &Notification| println!("[notice] {}", n)));

    let bus = EntityId::from("KA-34-F-2020");
    let path = demo_track(track);
    let points = path.len();
    driver.sender().send(SourceMessage::StartTrack { entity: bus.clone(), path });

    let royal_circle = Stop::new("Royal circle", GeoPoint::new(15.1490, 76.9280));
    let mut last_index = None;

    loop {
        driver.pump();

        let engine = driver.engine();
        let index = engine.active_track().map(|s| s.index);
        if index != last_index {
            if let Some(index) = index {
                if let Some(position) = engine.rendered_position(&bus) {
                    println!("{:>3}/{} {} at {}", index + 1, points, bus, position);
                }
            }
            last_index = index;
        }

        if engine.active_track().is_none() && engine.stats().tracks_started > 0 && !engine.wants_frame() {
            break;
        }
        std::thread::sleep(frame_interval);
    }

    let engine = driver.engine();
    println!("\nArrivals at {}:", royal_circle.name);
    for arrival in engine.arrivals_for_stop(&royal_circle) {
        println!("  {:<16} {:>3} min", arrival.entity, arrival.eta_minutes);
    }
    println!("\n{}", serde_json::to_string_pretty(engine.stats())?);

    driver.teardown();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("busline-tracker", |s| s.as_str());

    let mut manager = ConfigurationManager::new();
    let mut track = DEFAULT_TRACK.to_string();
    let mut speedup = DEFAULT_SPEEDUP;

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--list-tracks" => {
                for name in demo_track_names() {
                    println!("{} ({} points)", name, demo_track(name).len());
                }
                return Ok(());
            }
            "--write-config" => {
                let Some(path) = rest.next() else {
                    usage(program);
                    return Err("--write-config needs a path".into());
                };
                manager.save_to_file(path)?;
                println!("Wrote default configuration to {}", path);
                return Ok(());
            }
            "--config" => {
                let Some(path) = rest.next() else {
                    usage(program);
                    return Err("--config needs a path".into());
                };
                manager.load_from_file(path)?;
            }
            "--track" => {
                let Some(name) = rest.next() else {
                    usage(program);
                    return Err("--track needs a name".into());
                };
                track = name.clone();
            }
            "--speedup" => {
                let Some(value) = rest.next() else {
                    usage(program);
                    return Err("--speedup needs a factor".into());
                };
                speedup = value.parse()?;
            }
            _ => {
                usage(program);
                return Err(format!("unknown argument: {}", arg).into());
            }
        }
    }

    let config = manager.config().clone().accelerated(speedup);
    tracing::info!(track = %track, speedup, tick = ?Duration::from_millis(config.track_tick_interval_ms), "starting demo playback");
    run_demo(config, &track)
}
