use std::path::Path;
use std::process;

use log::{error, Level};

use slidecrop::commands::{build_cli, CommandFactory, SlideCropCommandFactory};
use slidecrop::utils::logger::Logger;

fn main() {
    let matches = build_cli().get_matches();

    let log_file = matches.subcommand()
        .and_then(|(_, sub)| sub.get_one::<String>("log-file"))
        .or_else(|| matches.get_one::<String>("log-file"));

    match log_file {
        Some(path) => {
            if let Err(e) = Logger::init_global_logger(Path::new(path), Level::Info) {
                eprintln!("Error setting up logger: {}", e);
                process::exit(1);
            }
        }
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        }
    }

    let factory = SlideCropCommandFactory::new();

    match factory.create_command(&matches) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
