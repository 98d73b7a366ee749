use log::debug;
use tracing_log::AsTrace;

use std::io::IsTerminal;
use std::path::PathBuf;

mod actions;
mod cli;
mod config;
mod menu;
mod output;

use cli::Settings;
use config::Config;

fn main() {
    // parse command line options
    let matches = cli::command().get_matches();

    // load config from file, when one is given
    let config = match matches.get_one::<PathBuf>("CONFIG") {
        Some(file) => match Config::load(file) {
            Ok(c) => c,
            Err(error) => {
                eprintln!("error loading config file: {}\n{error}", file.display());
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let settings = match Settings::new(&matches, &config) {
        Ok(s) => s,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    // configure debug log
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(settings.level.as_trace())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to initialize debug log: {e}");
        std::process::exit(1);
    }

    if let Err(e) = tracing_log::LogTracer::init_with_filter(settings.level.to_level_filter()) {
        eprintln!("failed to initialize debug log: {e}");
        std::process::exit(1);
    }

    debug!("host roots: {:?}", settings.host);

    // with no arguments on a terminal, fall into the interactive menu
    let interactive =
        settings.menu || (std::env::args_os().len() == 1 && std::io::stdin().is_terminal());

    let result = if interactive {
        let stdin = std::io::stdin();
        menu::run(&settings, &mut stdin.lock(), &mut std::io::stdout())
    } else {
        actions::execute(&settings)
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
