//! setup-ndk-clang CI step.

// The binary talks to the runner over stdout and to humans over stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;
use setup_ndk_clang::actions::ActionsContext;
use setup_ndk_clang::cli::{Cli, CliError, EXIT_FAILED, EXIT_OK, render_error};
use setup_ndk_clang::tracing::init_tracing;
use setup_ndk_clang_core::{Installation, Installer, InstallerConfig};

fn main() {
    // NOTE: tracing may be unusable during a panic, so write directly.
    std::panic::set_hook(Box::new(|panic_info| {
        println!("::error::setup-ndk-clang panicked");
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help and --version
            let _ = e.print();
            std::process::exit(EXIT_OK);
        }
        Err(e) => {
            render_error(CliError::input(e.to_string().trim_end()));
            std::process::exit(EXIT_FAILED);
        }
    };

    if let Err(e) = init_tracing(cli.tracing_config()) {
        eprintln!("{e:?}");
    }

    let code = match run(&cli) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            render_error(e);
            EXIT_FAILED
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let installation = install(cli)?;

    let actions = ActionsContext::from_env();
    for dir in &installation.path_additions {
        actions.add_path(dir)?;
    }

    actions.set_output("clang-path", &installation.path.to_string_lossy())?;
    actions.set_output("ndk-version", &installation.version)?;
    Ok(())
}

/// Run the install flow on a runtime that is shut down before returning.
fn install(cli: &Cli) -> Result<Installation, CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| CliError::Runtime {
            context: "Failed to create tokio runtime",
            source,
        })?;

    let config = cli.installer_config(InstallerConfig::new());
    let installer = Installer::new(config)?;
    let installation =
        runtime.block_on(installer.ensure_clang(&cli.ndk_version, cli.install_options()))?;
    runtime.shutdown_background();
    Ok(installation)
}
