use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use relay_core::enums::BoardKind;

/// Top-level CLI parser for the `relay` binary.
#[derive(Debug, Parser)]
#[command(name = "relay", version, about = "Relay - lead and referral boards with a support desk")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (errors only, no JSON output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Extra TOML config file, merged over relay.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            quiet: self.quiet,
            verbose: self.verbose,
            config: self.config.clone(),
        }
    }
}

/// Global flags available before or after subcommands.
#[derive(Clone, Debug, Default)]
pub struct GlobalFlags {
    pub quiet: bool,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the email worker until interrupted.
    Serve,
    /// Create or upgrade the database schema.
    Migrate,
    /// Create a demo organization with sample columns and records.
    Seed(SeedArgs),
    /// Write one board of an organization as CSV.
    Export(ExportArgs),
    /// List organizations.
    Orgs(OrgsArgs),
}

#[derive(Clone, Debug, Args)]
pub struct SeedArgs {
    /// Organization name
    #[arg(long)]
    pub name: String,
    /// Clerk user ID of the owner
    #[arg(long)]
    pub owner: String,
    /// Owner email address
    #[arg(long)]
    pub email: String,
    /// Sample leads to create
    #[arg(long, default_value_t = 10)]
    pub leads: u32,
    /// Sample referrals to create
    #[arg(long, default_value_t = 10)]
    pub referrals: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum BoardArg {
    Leads,
    Referrals,
}

impl From<BoardArg> for BoardKind {
    fn from(arg: BoardArg) -> Self {
        match arg {
            BoardArg::Leads => Self::Leads,
            BoardArg::Referrals => Self::Referrals,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct ExportArgs {
    /// Organization ID
    #[arg(long)]
    pub org: String,
    #[arg(long, value_enum)]
    pub board: BoardArg,
    /// Output file (stdout when omitted)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Clone, Debug, Args)]
pub struct OrgsArgs {
    #[arg(short, long)]
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{BoardArg, Cli, Commands};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["relay", "orgs", "--limit", "5", "--quiet", "--config", "/tmp/r.toml"])
            .expect("cli should parse");
        assert!(cli.quiet);
        let flags = cli.global_flags();
        assert_eq!(flags.config.as_deref(), Some(std::path::Path::new("/tmp/r.toml")));
        match cli.command {
            Commands::Orgs(args) => assert_eq!(args.limit, Some(5)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn seed_defaults_record_counts() {
        let cli = Cli::try_parse_from([
            "relay", "seed", "--name", "Acme", "--owner", "user_1", "--email", "a@acme.test",
        ])
        .expect("cli should parse");
        let Commands::Seed(args) = cli.command else {
            panic!("expected seed");
        };
        assert_eq!((args.leads, args.referrals), (10, 10));
    }

    #[test]
    fn export_requires_a_known_board() {
        let ok = Cli::try_parse_from(["relay", "export", "--org", "org-1", "--board", "referrals"])
            .expect("cli should parse");
        let Commands::Export(args) = ok.command else {
            panic!("expected export");
        };
        assert_eq!(args.board, BoardArg::Referrals);
        assert!(args.out.is_none());

        assert!(Cli::try_parse_from(["relay", "export", "--org", "org-1", "--board", "tasks"]).is_err());
    }
}
