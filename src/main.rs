use std::io::Write;

use clap::Parser;
use ffwrap::FfxError;

mod cli;

fn main() {
    let args = cli::Cli::parse();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if args.verbose {
            "ffwrap=debug".to_string()
        } else {
            "ffwrap=info".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match execute(&args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

fn execute(args: &cli::Cli) -> Result<i32, FfxError> {
    let command = cli::build_command(args)?;

    if args.dry_run {
        println!("{}", command.to_shell_string());
        return Ok(0);
    }

    command.scoped(|process| {
        let mut stdout = std::io::stdout().lock();
        for line in process.read_lines(args.keep_ends) {
            let line = line?;
            if args.keep_ends {
                write!(stdout, "{line}")?;
            } else {
                writeln!(stdout, "{line}")?;
            }
        }
        stdout.flush()?;

        let status = process.wait()?;
        tracing::info!(%status, "process finished");
        Ok(status.code().unwrap_or(1))
    })
}
