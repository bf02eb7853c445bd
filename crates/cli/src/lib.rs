mod cache;
mod inspect;
mod resolve;
mod scan;
mod session;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "classdex",
    version,
    about = "Classpath-wide type discovery and import resolution for Java",
    long_about = "Classdex scans the JDK and project classpath once, builds a package index of every \
                  type it finds, and answers which types an import directive brings into scope."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Directory for the platform package cache
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Do not read or write the platform package cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ClasspathArgs {
    /// Project classpath entries (jars, jmods or class directories). May be
    /// repeated or joined with the platform path separator.
    #[arg(short = 'c', long = "classpath", value_name = "PATH")]
    pub classpath: Vec<String>,

    /// Skip JDK discovery and index only the given classpath
    #[arg(long)]
    pub no_jdk: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the classpath and report what was indexed
    Scan {
        #[command(flatten)]
        classpath: ClasspathArgs,

        /// Package whose sub-packages to list after the scan
        #[arg(long, value_name = "PACKAGE")]
        packages: Option<String>,
    },
    /// Show the types an import directive brings into scope
    #[command(
        long_about = "Resolves an import such as 'java.util.*', 'import java.util.List;' or \
                      'import static java.lang.Math.max;' against the scanned classpath."
    )]
    Resolve {
        /// Import directive or dotted path
        #[arg(value_name = "IMPORT")]
        import: String,

        #[command(flatten)]
        classpath: ClasspathArgs,
    },
    /// Print the shape of a single class file
    Inspect {
        #[arg(value_name = "CLASS_FILE")]
        path: PathBuf,
    },
    /// Manage the platform package cache
    #[command(subcommand)]
    Cache(cache::CacheCommands),
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Cli { global, command } = Cli::parse();
    let _guard = classdex_core::logging::init_logging("cli", global.verbose);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        match command {
            Commands::Scan {
                classpath,
                packages,
            } => scan::run(&global, &classpath, packages.as_deref()).await,
            Commands::Resolve { import, classpath } => {
                resolve::run(&global, &classpath, &import).await
            }
            Commands::Inspect { path } => inspect::run(&path),
            Commands::Cache(cmd) => cache::run(&global, cmd),
        }
    })
}
