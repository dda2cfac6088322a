use std::io;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use myshell::config::{ShellArgs, ShellConfig};
use myshell::process::ignore_interactive_signals;
use myshell::repl::{self, Banner, Identity, LineSource};
use myshell::Executor;

fn main() -> anyhow::Result<()> {
    let args: ShellArgs = argh::from_env();

    // MYSHELL_LOG picks the log level; quiet unless asked.
    let filter = EnvFilter::try_from_env("MYSHELL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    if args.examples {
        repl::print_examples(&mut io::stdout())?;
        return Ok(());
    }

    let config = ShellConfig::from_launch_dir().context("Could not get the base cwd")?;
    ignore_interactive_signals()?;

    let mut source = match &args.batch {
        Some(name) => {
            let path = config.batch_file(name);
            LineSource::batch(&path)
                .with_context(|| format!("Failed attempting to open file: {}", path.display()))?
        }
        None => LineSource::stdin()?,
    };
    let identity = Identity::current();
    let quiet = source.is_quiet();

    if !quiet {
        repl::banner(&mut io::stdout(), Banner::Welcome)?;
    }
    let mut executor = Executor::new(config);
    repl::run(&mut executor, &mut source, &identity);
    if !quiet {
        repl::banner(&mut io::stdout(), Banner::Farewell)?;
    }
    Ok(())
}
