//! Firework Shell CLI - Compile blueprints and inspect or play compiled shows.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use firework_shell::{
    compute::compile_with_stats,
    playback::{DEFAULT_CAPACITY, Environment, KindTable, RenderParticle, ShowPlayer},
    schema::{Blueprint, ProfileDatabase, ProfileIndex, ProfileSource},
    show::{FormatVersion, load_show, save_show},
};

/// Playback frame rate for `play`.
const FRAME_DT: f32 = 1.0 / 60.0;

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--example") => print_example_blueprint(),
        Some("compile") if args.len() >= 4 => run_compile(&args[2..]),
        Some("inspect") if args.len() >= 3 => run_inspect(Path::new(&args[2])),
        Some("play") if args.len() >= 3 => run_play(&args[2..]),
        _ => {
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} compile <blueprint.json> <out.hnb> [--db profiles.json] [--seed n] [--v1]", program);
    eprintln!("  {} inspect <show.hnb>", program);
    eprintln!("  {} play <show.hnb> [seconds] [--db profiles.json]", program);
    eprintln!("  {} --example", program);
    eprintln!();
    eprintln!("Compile firework shell blueprints into burst/particle shows.");
}

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn exit_with(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("Error {}: {}", context, err);
    std::process::exit(1);
}

fn load_profiles(path: Option<&str>) -> Option<ProfileIndex> {
    let path = path?;
    let text = fs::read_to_string(path).unwrap_or_else(|e| exit_with("reading profile database", e));
    let db = ProfileDatabase::from_json(&text).unwrap_or_else(|e| exit_with("parsing profile database", e));
    Some(ProfileIndex::new(db))
}

fn run_compile(args: &[String]) {
    let blueprint_path = PathBuf::from(&args[0]);
    let out_path = PathBuf::from(&args[1]);
    let options = &args[2..];

    let text = fs::read_to_string(&blueprint_path).unwrap_or_else(|e| exit_with("reading blueprint", e));
    let blueprint: Blueprint = serde_json::from_str(&text).unwrap_or_else(|e| exit_with("parsing blueprint", e));

    let profiles = load_profiles(flag_value(options, "--db"));
    let seed = flag_value(options, "--seed").map(|s| {
        s.parse::<u32>()
            .unwrap_or_else(|e| exit_with("parsing --seed", e))
    });
    let version = if options.iter().any(|a| a == "--v1") {
        FormatVersion::V1
    } else {
        FormatVersion::V2
    };

    println!("Firework Shell Compile");
    println!("======================");
    println!("Blueprint: {}", blueprint_path.display());
    println!(
        "Shell: {:?} ({}^3 voxels), {} requested stars",
        blueprint.size,
        blueprint.size.resolution(),
        blueprint.stars.count
    );
    println!();

    let start = Instant::now();
    let (show, stats) = compile_with_stats(
        &blueprint,
        profiles.as_ref().map(|p| p as &dyn ProfileSource),
        seed,
    );
    let elapsed = start.elapsed();

    save_show(&out_path, &show, version).unwrap_or_else(|e| exit_with("writing show", e));

    println!("{}", stats);
    println!("Seed: {}", show.seed);
    println!("Last burst: {:.3}s", show.duration());
    println!("Wrote {} ({:?})", out_path.display(), version);
    println!("Time: {:.1}ms", elapsed.as_secs_f32() * 1000.0);
}

fn run_inspect(path: &Path) {
    let show = load_show(path).unwrap_or_else(|e| exit_with("loading show", e));

    println!("Show: {}", path.display());
    println!("  Seed: {}", show.seed);
    println!(
        "  Launch: speed={:.1}, fuse={:.2}s, gravity x{:.2}, wind x{:.2}, drag x{:.2}",
        show.launch.speed,
        show.launch.fuse_duration,
        show.launch.gravity_scale,
        show.launch.wind_scale,
        show.launch.drag_scale
    );
    println!("  Bursts: {}", show.bursts.len());
    println!("  Particles: {}", show.particles.len());
    println!("  Time ordered: {}", show.is_time_ordered());
    println!();

    for (i, burst) in show.bursts.iter().enumerate().take(20) {
        println!(
            "  [{:3}] t={:.3}s pos=({:+.2}, {:+.2}, {:+.2}) particles={}..{}",
            i,
            burst.time,
            burst.position.x,
            burst.position.y,
            burst.position.z,
            burst.start,
            burst.start + burst.count
        );
    }
    if show.bursts.len() > 20 {
        println!("  ... {} more", show.bursts.len() - 20);
    }
}

fn run_play(args: &[String]) {
    let path = Path::new(&args[0]);
    let seconds: f32 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10.0);
    let profiles = load_profiles(flag_value(&args[1..], "--db"));

    let show = load_show(path).unwrap_or_else(|e| exit_with("loading show", e));
    let kinds = KindTable::for_profiles(profiles.as_ref());
    let mut player = ShowPlayer::new(show, DEFAULT_CAPACITY).with_environment(Environment::default());
    let mut frame = vec![RenderParticle::default(); DEFAULT_CAPACITY * 4];

    println!("Playing {} for {:.1}s", path.display(), seconds);

    let frames = (seconds / FRAME_DT).ceil() as u64;
    let report_every = (frames / 10).max(1);
    let start = Instant::now();
    let mut peak_points = 0;

    for i in 0..frames {
        player.update(FRAME_DT);
        let points = player.integrator().fill_particles_by_kind(&kinds, &mut frame);
        peak_points = peak_points.max(points);

        if (i + 1) % report_every == 0 {
            println!(
                "  t={:5.2}s bursts={}/{} live={} visible={} points={}",
                player.clock(),
                player.fired(),
                player.show().bursts.len(),
                player.integrator().len(),
                player.integrator().visible_count(),
                points
            );
        }
        if player.is_finished() {
            println!("  Show finished at t={:.2}s", player.clock());
            break;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("Peak render points: {}", peak_points);
    println!("Time: {:.2}s", elapsed.as_secs_f32());
}

fn print_example_blueprint() {
    let blueprint = Blueprint::example();
    println!("{}", serde_json::to_string_pretty(&blueprint).unwrap());
}
