// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use log::{info, warn};
use routenav::{
    EnglishInstructions, FileFormat, Instructions, NavigationData, NavigationState, Navigator,
    NavigatorObserver, NavigatorTurn, Point, Profile, Route,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}: {1}")]
    Route(PathBuf, #[source] routenav::Error),

    #[error("{0}:{1}: expected \"x y [time]\", got {2:?}")]
    Fix(PathBuf, usize, String),

    #[error("{0}: {1}")]
    Io(PathBuf, #[source] io::Error),
}

#[derive(Parser)]
struct Cli {
    /// The route file (XML, optionally gzip or bzip2 compressed)
    route_file: PathBuf,

    /// Replay position fixes from a file, one "x y [time]" per line
    #[arg(long)]
    fixes: Option<PathBuf>,

    /// Write the route back as XML (compressed based on the extension)
    #[arg(long)]
    xml: Option<PathBuf>,

    /// Write the route path as a GPX track, with x as longitude and y as latitude
    #[arg(long)]
    gpx: Option<PathBuf>,

    /// Use yards and miles in instructions
    #[arg(long)]
    imperial: bool,

    /// Use short unit names in instructions
    #[arg(long)]
    abbreviate: bool,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let route = Route::read_from_xml_file(&cli.route_file, FileFormat::Unknown)
        .map_err(|e| CliError::Route(cli.route_file.clone(), e))?;
    info!(
        "loaded {}: {} segments, {:.0} m, {:.0} s",
        cli.route_file.display(),
        route.segments.len(),
        route.distance,
        route.time
    );

    print_turns(&route, !cli.imperial, cli.abbreviate);

    if let Some(path) = &cli.xml {
        route
            .write_xml_file(path, FileFormat::Unknown)
            .map_err(|e| CliError::Route(path.clone(), e))?;
    }

    if let Some(path) = &cli.gpx {
        let f = File::create(path).map_err(|e| CliError::Io(path.clone(), e))?;
        route
            .write_as_gpx(io::BufWriter::new(f), |p| (p.y, p.x))
            .map_err(|e| CliError::Route(path.clone(), e))?;
    }

    if let Some(path) = &cli.fixes {
        let fixes = load_fixes(path)?;
        replay(route, fixes, !cli.imperial, cli.abbreviate);
    }

    Ok(())
}

/// Lists every announced turn of the route, measured from the previous one.
fn print_turns(route: &Route, metric_units: bool, abbreviate: bool) {
    let mut distance = 0.0;
    let mut time = 0.0;
    for (i, s) in route.segments.iter().enumerate() {
        if i > 0 && s.turn.turn_type.is_significant() {
            let t = NavigatorTurn::new(&route.segments[i - 1], Some(s), distance, time);
            println!(
                "{:>4}  {}",
                i,
                EnglishInstructions.render(&t, &route.profile, "en", metric_units, abbreviate)
            );
            distance = 0.0;
            time = 0.0;
        }
        distance += s.distance;
        time += s.time;
    }

    if let Some(last) = route.segments.last() {
        let t = NavigatorTurn::new(last, None, distance, time);
        println!(
            "{:>4}  {}",
            route.segments.len(),
            EnglishInstructions.render(&t, &route.profile, "en", metric_units, abbreviate)
        );
    }
}

fn load_fixes(path: &Path) -> Result<Vec<NavigationData>, CliError> {
    let f = File::open(path).map_err(|e| CliError::Io(path.to_path_buf(), e))?;
    let mut fixes = Vec::default();

    for (i, line) in BufReader::new(f).lines().enumerate() {
        let line = line.map_err(|e| CliError::Io(path.to_path_buf(), e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let malformed = || CliError::Fix(path.to_path_buf(), i + 1, line.to_string());
        let values = line
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| malformed())?;

        let fix = match values[..] {
            [x, y] => NavigationData::new(Point::new(x, y), 0.0),
            [x, y, time] => NavigationData::new(Point::new(x, y), time),
            _ => return Err(malformed()),
        };
        fixes.push(fix);
    }

    // Fixes without times are spaced a second apart
    if fixes.iter().all(|f| f.time == 0.0) {
        for (i, f) in fixes.iter_mut().enumerate() {
            f.time = i as f64;
        }
    }

    Ok(fixes)
}

/// Prints every notification of the navigator.
struct Printer {
    profile: Profile,
    metric_units: bool,
    abbreviate: bool,
}

impl NavigatorObserver for Printer {
    fn on_route(&self, route: Option<&Route>) {
        match route {
            Some(r) => println!("route: {} segments, {:.0} m", r.segments.len(), r.distance),
            None => println!("route: none"),
        }
    }

    fn on_turn(
        &self,
        first: &NavigatorTurn,
        second: Option<&NavigatorTurn>,
        _continuation: Option<&NavigatorTurn>,
    ) {
        let render = |t: &NavigatorTurn| {
            EnglishInstructions.render(t, &self.profile, "en", self.metric_units, self.abbreviate)
        };
        match second {
            Some(s) => println!("turn: {}, then {}", render(first), render(s)),
            None => println!("turn: {}", render(first)),
        }
    }

    fn on_state(&self, state: NavigationState) {
        println!("state: {}", state);
    }
}

fn replay(route: Route, fixes: Vec<NavigationData>, metric_units: bool, abbreviate: bool) {
    let mut navigator = Navigator::default();
    navigator.add_observer(Arc::new(Printer {
        profile: route.profile.clone(),
        metric_units,
        abbreviate,
    }));
    navigator.use_route(route, Vec::default());

    for fix in fixes {
        if let Err(e) = navigator.navigate(fix) {
            warn!("fix at {:?} rejected: {}", fix.position, e);
        }
    }
}
