/*!
 * w3stat CLI - Command Line Interface
 */

use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing::debug;
use w3stat::{
    backend::{DenylistLookup, DudewhereLookup, IndexLookup},
    config::{LogLevel, LookupConfig, R2Credentials},
    error::{Result, StatError, EXIT_SUCCESS},
    logging::{self, LogOptions},
    output::OutputWriter,
    protocol::{DynamoClient, S3Client},
    runner, InputSource, Pipeline,
};

#[derive(Parser)]
#[command(name = "w3stat")]
#[command(
    version,
    about = "Find out what the denylist, dudewhere and block index know about a CID",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// CIDs to look up with every backend; read from stdin when omitted
    #[arg(value_name = "CID")]
    cids: Vec<String>,

    /// Format output as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Group JSON output into arrays of N records
    #[arg(long, value_name = "N", global = true)]
    batch: Option<usize>,

    /// Maximum CIDs in flight at once
    #[arg(short = 'j', long, value_name = "N", global = true)]
    concurrency: Option<usize>,

    /// Per backend call timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    /// Verbose logging (debug level)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Write JSON logs to FILE instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    log: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct CidArgs {
    /// CIDs; read from stdin (one per line) when omitted
    #[arg(value_name = "CID")]
    cids: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find out what we know about a CID (default)
    Cid(CidArgs),

    /// Check if a CID is on the denylist
    Denylist(CidArgs),

    /// Check the dudewhere mapping from root CID to CAR CIDs
    Dudewhere {
        #[command(flatten)]
        input: CidArgs,

        /// Bucket name
        #[arg(short = 'b', long)]
        bucket: Option<String>,
    },

    /// Check whether a CID is in the DynamoDB block index
    Dynamo {
        #[command(flatten)]
        input: CidArgs,

        /// Table name
        #[arg(long)]
        table: Option<String>,
    },

    /// Convert a CID to its multihash with base58btc multibase prefix
    Mh(CidArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Backends a lookup command queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Selection {
    denylist: bool,
    dudewhere: bool,
    index: bool,
}

impl Selection {
    const ALL: Selection = Selection {
        denylist: true,
        dudewhere: true,
        index: true,
    };
    const NONE: Selection = Selection {
        denylist: false,
        dudewhere: false,
        index: false,
    };
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(StatError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut bucket = None;
    let mut table = None;
    let (cids, selection) = match cli.command {
        Some(Commands::Completions { shell }) => {
            use clap::CommandFactory;
            use clap_complete::generate;
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "w3stat", &mut io::stdout());
            return Ok(());
        }
        None => (cli.cids, Selection::ALL),
        Some(Commands::Cid(input)) => (input.cids, Selection::ALL),
        Some(Commands::Denylist(input)) => (
            input.cids,
            Selection {
                denylist: true,
                ..Selection::NONE
            },
        ),
        Some(Commands::Dudewhere { input, bucket: name }) => {
            bucket = name;
            (
                input.cids,
                Selection {
                    dudewhere: true,
                    ..Selection::NONE
                },
            )
        }
        Some(Commands::Dynamo { input, table: name }) => {
            table = name;
            (
                input.cids,
                Selection {
                    index: true,
                    ..Selection::NONE
                },
            )
        }
        Some(Commands::Mh(input)) => (input.cids, Selection::NONE),
    };

    // defaults, then the config file, then flags
    let mut config = LookupConfig::load(cli.config.as_deref())?;
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout) = cli.timeout {
        config.call_timeout_secs = timeout;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(bucket) = bucket {
        config.bucket = bucket;
    }
    if let Some(table) = table {
        config.table = table;
    }
    config.validate()?;

    let log_options = LogOptions {
        level: config.log_level,
        verbose: cli.verbose,
        file: cli.log.clone(),
    };
    if let Err(e) = logging::init_logging(&log_options) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    // Fail before any input is read
    let credentials = if selection.dudewhere {
        Some(R2Credentials::from_env()?)
    } else {
        None
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| StatError::Runtime(format!("Failed to start async runtime: {}", e)))?;

    let mut writer = OutputWriter::stdout(cli.json);
    let batch = cli.batch;

    runtime.block_on(async move {
        if selection == Selection::NONE {
            let inputs = InputSource::from_args_or_stdin(cids).into_stream();
            runner::run_multihash(inputs, &mut writer).await?;
            return Ok::<_, StatError>(());
        }

        let pipeline = build_pipeline(&config, selection, credentials).await?;
        let inputs = InputSource::from_args_or_stdin(cids).into_stream();
        runner::run_lookups(&pipeline, inputs, &mut writer, batch).await?;
        Ok::<_, StatError>(())
    })
}

/// Construct the selected backend clients once and wire them into a pipeline
async fn build_pipeline(
    config: &LookupConfig,
    selection: Selection,
    credentials: Option<R2Credentials>,
) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new()
        .concurrency(config.concurrency)
        .call_timeout(config.call_timeout());

    if selection.denylist {
        debug!(url = %config.denylist_url, "using denylist");
        pipeline = pipeline.with_denylist(DenylistLookup::new(
            &config.denylist_url,
            config.call_timeout(),
        )?);
    }

    if selection.dudewhere {
        let credentials = match credentials {
            Some(credentials) => credentials,
            None => R2Credentials::from_env()?,
        };
        debug!(endpoint = %config.r2_endpoint, bucket = %config.bucket, "using dudewhere");
        let lister = S3Client::new(config.s3_config(credentials)).await?;
        pipeline = pipeline.with_dudewhere(DudewhereLookup::new(lister, &config.bucket));
    }

    if selection.index {
        debug!(table = %config.table, "using block index");
        let client = DynamoClient::new(config.dynamo_region.clone(), config.call_timeout()).await;
        pipeline = pipeline.with_index(IndexLookup::new(client, &config.table));
    }

    Ok(pipeline)
}
