use anyhow::{Context, Result};
use bitcat::areas::repository::Repository;
use bitcat::commands::plumbing::cat_file::CatFileMode;
use bitcat::config::{Config, DEFAULT_MAX_DELTA_DEPTH, DEFAULT_MAX_REF_DEPTH};
use bitcat::errors::Error;
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "bitcat",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Read objects out of a git repository",
    long_about = "This tool reads the object database of an existing git repository. \
    It resolves refs, looks objects up in pack files and loose object files, \
    and prints them. It never writes to the repository.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity (-v debug, -vv trace)"
    )]
    verbose: u8,
    #[arg(
        long,
        global = true,
        env = "GIT_DIR",
        help = "Path to the git directory, discovered from the current directory by default"
    )]
    git_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_MAX_REF_DEPTH,
        help = "Symbolic ref hops followed before giving up"
    )]
    max_ref_depth: usize,
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_MAX_DELTA_DEPTH,
        help = "Delta links followed while rebuilding one packed object"
    )]
    max_delta_depth: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "cat-file",
        about = "Print the content, type or size of an object",
        long_about = "This command prints information about an object in the repository. \
        The object may be named by a ref or by a full or abbreviated id.",
        group(
            ArgGroup::new("mode")
                .required(true)
                .args(["pretty", "show_type", "size", "exists"])
        )
    )]
    CatFile {
        #[arg(short = 'p', help = "Pretty-print the object content")]
        pretty: bool,
        #[arg(short = 't', help = "Show the object type")]
        show_type: bool,
        #[arg(short = 's', help = "Show the object size")]
        size: bool,
        #[arg(short = 'e', help = "Exit with zero status if the object exists")]
        exists: bool,
        #[arg(index = 1, help = "The ref or object id")]
        name: String,
    },
    #[command(
        name = "ls-tree",
        about = "List the contents of a tree object",
        long_about = "This command lists the entries of a tree. Commits are listed through \
        their tree and tags through the object they point at."
    )]
    LsTree {
        #[arg(short, long, help = "Recurse into subtrees")]
        recursive: bool,
        #[arg(index = 1, help = "The tree-ish to list")]
        name: String,
    },
    #[command(
        name = "rev-parse",
        about = "Print the object id a name resolves to",
        long_about = "This command resolves a ref or abbreviated id and prints the full object id."
    )]
    RevParse {
        #[arg(index = 1, help = "The ref or object id")]
        name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = configure_logging(cli.verbose) {
        eprintln!("{} {err:#}", "warning:".yellow().bold());
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match cli.git_dir {
        Some(git_dir) => Config::new(git_dir),
        None => {
            let pwd = std::env::current_dir().context("Unable to read current directory")?;
            Config::discover(&pwd)?
        }
    }
    .with_max_ref_depth(cli.max_ref_depth)
    .with_max_delta_depth(cli.max_delta_depth);

    let repository = Repository::new(config, Box::new(std::io::stdout()))
        .context("Unable to open repository")?;

    match &cli.command {
        Commands::CatFile {
            pretty,
            show_type,
            size,
            exists: _,
            name,
        } => {
            let mode = if *pretty {
                CatFileMode::Pretty
            } else if *show_type {
                CatFileMode::Type
            } else if *size {
                CatFileMode::Size
            } else {
                CatFileMode::Exists
            };

            repository.cat_file(name, mode)?
        }
        Commands::LsTree { recursive, name } => repository.ls_tree(name, *recursive)?,
        Commands::RevParse { name } => repository.rev_parse(name)?,
    }

    Ok(())
}

/// Exit status of the first typed failure in the error chain, 1 otherwise
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(Error::exit_code)
        .unwrap_or(1)
}

fn configure_logging(verbosity: u8) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;

    let mut directives = match verbosity {
        0 => "bitcat=warn",
        1 => "bitcat=debug",
        _ => "bitcat=trace",
    }
    .to_string();
    if let Ok(overrides) = std::env::var("BITCAT_LOG") {
        directives = format!("{directives},{overrides}");
    }
    if let Ok(overrides) = std::env::var("RUST_LOG") {
        // full override for debugging
        directives = overrides;
    }

    let env_filter = tracing_subscriber::filter::EnvFilter::new(directives);
    let registry = tracing_subscriber::Registry::default().with(env_filter);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(verbosity > 1);

    tracing::subscriber::set_global_default(registry.with(fmt_layer))
        .context("Failed to set default logger")
}
