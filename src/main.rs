use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use webdrivermanager::{BrowserType, Config, DriverRequest, Resolver, cache};

#[derive(Parser)]
#[command(name = "wdm")]
#[command(version, about = "Resolves, downloads and caches browser drivers")]
struct Cli {
    /// Debug output for the resolution steps.
    #[arg(long, global = true)]
    verbose: bool,

    /// Only print errors.
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve and download the driver for a browser
    /// (chrome, firefox, edge, opera, iexplorer, phantomjs, selenium-server-standalone).
    Resolve {
        browser: BrowserType,

        /// Driver version instead of the one matching the installed browser.
        #[arg(long)]
        version: Option<String>,

        /// Print the driver's export variable as `name=path`.
        #[arg(long)]
        export: bool,
    },
    /// Serve driver binaries over HTTP.
    Server {
        /// Port to listen on (defaults to wdm.serverPort).
        port: Option<u16>,
    },
    /// Forget remembered browser and driver versions.
    ClearPreferences,
    /// Delete every cached driver.
    ClearCache,
    /// Shorthand for `resolve <browser>`.
    #[command(external_subcommand)]
    Browser(Vec<String>),
}

fn init_logger(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("webdrivermanager=debug,wdm=debug")
    } else if quiet {
        EnvFilter::new("webdrivermanager=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("webdrivermanager=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command))
}

async fn run(command: Command) -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    match command {
        Command::Resolve {
            browser,
            version,
            export,
        } => resolve(config, browser, version, export).await,
        Command::Browser(args) => {
            let name = args.first().context("missing browser name")?;
            let browser: BrowserType = name.parse()?;
            let export = args.iter().skip(1).any(|a| a == "--export");
            resolve(config, browser, None, export).await
        }
        Command::Server { port } => {
            let port = port.unwrap_or(config.server_port);
            webdrivermanager::server::serve(config, port).await?;
            Ok(())
        }
        Command::ClearPreferences => {
            let mut resolver = Resolver::new(config)?;
            resolver.clear_preferences()?;
            println!("Preferences cleared");
            Ok(())
        }
        Command::ClearCache => {
            cache::clear(&config.target_path)?;
            println!("Removed {}", config.target_path.display());
            Ok(())
        }
    }
}

async fn resolve(
    config: Config,
    browser: BrowserType,
    version: Option<String>,
    export: bool,
) -> anyhow::Result<()> {
    let mut resolver = Resolver::new(config)?;
    let mut request = DriverRequest::new(browser);
    if let Some(version) = version {
        request = request.version(version);
    }

    let driver = resolver
        .setup(&request)
        .await
        .with_context(|| format!("could not set up a driver for {browser}"))?;

    match (&driver.export_variable, export) {
        (Some(variable), true) => println!("{}={}", variable, driver.path.display()),
        _ => println!("{}", driver.path.display()),
    }
    Ok(())
}
