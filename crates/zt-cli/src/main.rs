mod commands;
mod output;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use commands::{
    EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_GIT_ERROR, EXIT_MANIFEST_ERROR, EXIT_SUCCESS,
};
use output::{OutputFormat, Printer};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::warn;
use zt_core::config::parse_duration;
use zt_core::{Configuration, GitCli};
use zt_deploy::install_signal_handler;

#[derive(Debug, Parser)]
#[command(
    name = "zt",
    version,
    about = "Lint, validate, and deployment-test Zarf packages"
)]
struct Cli {
    /// Config file (default: first zt.yaml, zt.yml or zt.toml in ., .zt, $HOME/.zt, /etc/zt).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    /// Disable colored output.
    #[arg(long, default_value_t = false, global = true)]
    no_color: bool,

    /// Wrap each package in a GitHub Actions log group (with --output github).
    #[arg(long, default_value_t = false, global = true)]
    github_groups: bool,

    /// Print the effective configuration to stderr before running.
    #[arg(long, default_value_t = false, global = true)]
    print_config: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, visible_alias = "debug", default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Lint and validate changed, specific (--packages), or all (--all) packages.
    Lint {
        #[command(flatten)]
        select: SelectArgs,
        #[command(flatten)]
        lint: LintArgs,
    },
    /// Build, deploy, smoke-test, and remove packages on the current cluster.
    Install {
        #[command(flatten)]
        select: SelectArgs,
        #[command(flatten)]
        install: InstallArgs,
    },
    /// Lint packages, then install the ones that passed.
    #[command(visible_alias = "li")]
    LintAndInstall {
        #[command(flatten)]
        select: SelectArgs,
        #[command(flatten)]
        lint: LintArgs,
        #[command(flatten)]
        install: InstallArgs,
    },
    /// List packages changed since the merge base with the target branch.
    #[command(visible_aliases = ["ls-changed", "lsc"])]
    ListChanged {
        #[command(flatten)]
        changes: ChangeArgs,
    },
    /// Check that git, zarf, kubectl, and the configuration are usable.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

#[derive(Debug, Args)]
struct ChangeArgs {
    /// Git remote used to find the merge base.
    #[arg(long)]
    remote: Option<String>,
    /// Branch changes are compared against.
    #[arg(long)]
    target_branch: Option<String>,
    /// Directories containing packages (comma separated).
    #[arg(long, value_delimiter = ',', value_name = "DIR")]
    zarf_dirs: Vec<PathBuf>,
    /// Packages to skip, by directory name or path (comma separated).
    #[arg(long, value_delimiter = ',', value_name = "NAME")]
    excluded_packages: Vec<String>,
}

impl ChangeArgs {
    fn apply(&self, cfg: &mut Configuration) {
        if let Some(remote) = &self.remote {
            cfg.remote.clone_from(remote);
        }
        if let Some(branch) = &self.target_branch {
            cfg.target_branch.clone_from(branch);
        }
        if !self.zarf_dirs.is_empty() {
            cfg.zarf_dirs.clone_from(&self.zarf_dirs);
        }
        if !self.excluded_packages.is_empty() {
            cfg.excluded_packages.clone_from(&self.excluded_packages);
        }
    }
}

#[derive(Debug, Args)]
struct SelectArgs {
    #[command(flatten)]
    changes: ChangeArgs,
    /// Package directories to process instead of changed ones (comma separated).
    #[arg(long, value_delimiter = ',', value_name = "DIR")]
    packages: Vec<PathBuf>,
    /// Process every package under the package directories.
    #[arg(long, default_value_t = false)]
    all: bool,
    /// Skip packages whose metadata marks them deprecated.
    #[arg(long, default_value_t = false)]
    exclude_deprecated: bool,
}

impl SelectArgs {
    fn apply(&self, cfg: &mut Configuration) {
        self.changes.apply(cfg);
        if !self.packages.is_empty() {
            cfg.packages.clone_from(&self.packages);
        }
        cfg.all |= self.all;
        cfg.exclude_deprecated |= self.exclude_deprecated;
    }
}

#[derive(Debug, Args)]
struct LintArgs {
    /// Require a version bump when package content changed.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    check_version_increment: Option<bool>,
    /// Warn about images not pinned with a digest.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    validate_image_pinning: Option<bool>,
    /// Check component names, duplicates, and dependencies.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    validate_components: Option<bool>,
    /// Run the security and resource heuristics.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    validate_security: Option<bool>,
    /// Extra arguments passed to `zarf dev lint`.
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    zarf_lint_extra_args: Option<String>,
}

impl LintArgs {
    fn apply(&self, cfg: &mut Configuration) {
        let toggles = [
            (self.check_version_increment, &mut cfg.check_version_increment),
            (self.validate_image_pinning, &mut cfg.validate_image_pinning),
            (self.validate_components, &mut cfg.validate_components),
            (self.validate_security, &mut cfg.validate_security),
        ];
        for (flag, field) in toggles {
            if let Some(value) = flag {
                *field = value;
            }
        }
        if let Some(extra) = &self.zarf_lint_extra_args {
            cfg.zarf_lint_extra_args.clone_from(extra);
        }
    }
}

#[derive(Debug, Args)]
struct InstallArgs {
    /// Test an in-place upgrade from the target branch revision.
    #[arg(long, default_value_t = false)]
    upgrade: bool,
    /// Leave deployed packages in the cluster.
    #[arg(long, default_value_t = false)]
    skip_clean_up: bool,
    /// Prefix for generated test namespaces.
    #[arg(long)]
    namespace: Option<String>,
    /// Deployment timeout, in seconds or with a unit (e.g. 600, 10m).
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
    deployment_timeout: Option<Duration>,
    /// Extra arguments passed to `zarf package create`.
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    zarf_build_extra_args: Option<String>,
    /// Extra arguments passed to `zarf package deploy`.
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    zarf_deploy_extra_args: Option<String>,
}

impl InstallArgs {
    fn apply(&self, cfg: &mut Configuration) {
        cfg.upgrade |= self.upgrade;
        cfg.skip_clean_up |= self.skip_clean_up;
        if let Some(ns) = &self.namespace {
            cfg.namespace.clone_from(ns);
        }
        if let Some(timeout) = self.deployment_timeout {
            cfg.deployment_timeout = timeout;
        }
        if let Some(extra) = &self.zarf_build_extra_args {
            cfg.zarf_build_extra_args.clone_from(extra);
        }
        if let Some(extra) = &self.zarf_deploy_extra_args {
            cfg.zarf_deploy_extra_args.clone_from(extra);
        }
    }
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

impl Commands {
    fn installs(&self) -> bool {
        matches!(self, Self::Install { .. } | Self::LintAndInstall { .. })
    }

    /// Defaults, config file, environment, then this command's flags.
    /// `None` for commands that do not read the configuration.
    fn configure(&self, explicit: Option<&Path>) -> Result<Option<Configuration>, String> {
        let load = || Configuration::load(explicit).map_err(|e| format!("config error: {e}"));
        let cfg = match self {
            Self::Lint { select, lint } => {
                let mut cfg = load()?;
                select.apply(&mut cfg);
                lint.apply(&mut cfg);
                cfg
            }
            Self::Install { select, install } => {
                let mut cfg = load()?;
                select.apply(&mut cfg);
                install.apply(&mut cfg);
                cfg
            }
            Self::LintAndInstall {
                select,
                lint,
                install,
            } => {
                let mut cfg = load()?;
                select.apply(&mut cfg);
                lint.apply(&mut cfg);
                install.apply(&mut cfg);
                cfg
            }
            Self::ListChanged { changes } => {
                let mut cfg = load()?;
                changes.apply(&mut cfg);
                cfg
            }
            Self::Doctor | Self::Completions { .. } | Self::ManPages { .. } => return Ok(None),
        };
        Ok(Some(cfg))
    }
}

fn init_tracing(trace: bool, verbose: bool) {
    let default_level = if trace {
        "trace"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("ZT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn run_packages(cli: &Cli, mut cfg: Configuration) -> Result<u8, String> {
    cfg.finalize(cli.command.installs())
        .map_err(|e| format!("config error: {e}"))?;
    if cli.print_config {
        eprint!("{}", cfg.render());
    }

    let printer = Printer::new(cli.output, cli.no_color, cli.github_groups || cfg.github_groups);
    let workdir = PathBuf::from(".");
    let git = GitCli::new(workdir.clone());

    match cli.command {
        Commands::Lint { .. } => commands::lint::run(&cfg, &git, &workdir, &printer),
        Commands::Install { .. } => commands::install::run(&cfg, &git, &workdir, &printer),
        Commands::LintAndInstall { .. } => {
            commands::lint_and_install::run(&cfg, &git, &workdir, &printer)
        }
        Commands::ListChanged { .. } => commands::list_changed::run(&cfg, &git, &workdir, &printer),
        Commands::Doctor | Commands::Completions { .. } | Commands::ManPages { .. } => {
            Ok(EXIT_SUCCESS)
        }
    }
}

fn exit_code(msg: &str) -> u8 {
    if msg.starts_with("manifest error:")
        || msg.starts_with("failed to parse manifest")
        || msg.starts_with("failed to read manifest")
    {
        EXIT_MANIFEST_ERROR
    } else if msg.starts_with("git error:") {
        EXIT_GIT_ERROR
    } else if msg.starts_with("config error:") {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_FAILURE
    }
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let configured = cli.command.configure(cli.config.as_deref());
    let config_debug = matches!(&configured, Ok(Some(cfg)) if cfg.debug);
    init_tracing(cli.trace, cli.verbose || config_debug);

    if cli.command.installs() {
        if let Err(e) = install_signal_handler() {
            warn!("{e}");
        }
    }

    let result = match (&cli.command, configured) {
        (Commands::Completions { shell }, _) => commands::completions::run::<Cli>(*shell),
        (Commands::ManPages { dir }, _) => commands::man_pages::run::<Cli>(dir),
        (Commands::Doctor, _) => {
            commands::doctor::run(cli.config.as_deref(), cli.output == OutputFormat::Json)
        }
        (_, Ok(Some(cfg))) => run_packages(&cli, cfg),
        (_, Ok(None)) => Ok(EXIT_SUCCESS),
        (_, Err(msg)) => Err(msg),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code(&msg))
        }
    }
}
