use clap::Parser;
use clap::error::ErrorKind;

use planc::io::config_io::{config_path, load_config_raw, run_setup};

#[derive(Debug, Parser)]
#[command(
    name = "planc",
    version,
    about = "A two-pane TUI for browsing and annotating AI agent plan files"
)]
struct Cli {
    /// Re-run the interactive configuration wizard
    #[arg(long)]
    setup: bool,

    /// Launch straight into demo mode
    #[arg(long)]
    demo: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return;
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if cli.setup {
        let path = match config_path() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
        run_setup(&path, load_config_raw());
        return;
    }

    if let Err(e) = planc::tui::run(cli.demo) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
