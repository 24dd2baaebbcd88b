//! Command-line arguments

use clap::{Args, Parser, Subcommand};
use eyre::Result;
use std::path::PathBuf;
use trice_core::{
    Config, DEFAULT_ID_LIST, DEFAULT_ID_MAX, DEFAULT_ID_MAX_SHORT, DEFAULT_ID_MIN,
    DEFAULT_ID_MIN_SHORT, IdRange, Policy, SearchMethod,
};

/// Assign and reconcile trice IDs in C source trees
#[derive(Parser, Debug)]
#[command(name = "trice", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild the ID list from the IDs found in the sources
    Renew(ListArgs),

    /// Add the IDs found in the sources to the ID list
    #[command(visible_alias = "r")]
    Refresh(ListArgs),

    /// Give every trice without an ID a new one and update the ID list
    #[command(visible_alias = "u")]
    Update(UpdateArgs),

    /// Reset every ID in the sources to 0, leaving the ID list alone
    #[command(visible_alias = "z", alias = "zeroSourceTreeIds")]
    Zero(ZeroArgs),
}

/// Which source files to scan
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Source directory or file, may be given several times (default: ./)
    #[arg(short = 's', long = "src", value_name = "PATH")]
    pub src: Vec<PathBuf>,

    /// Glob of files to skip, relative to each source root
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// The ID list file
    #[arg(
        short = 'i',
        long = "idlist",
        aliases = ["til", "idList"],
        value_name = "FILE",
        default_value = DEFAULT_ID_LIST
    )]
    pub id_list: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub list: ListArgs,

    /// Lower end of the ID range for normal trices
    #[arg(long, alias = "IDMin", value_name = "ID", default_value_t = DEFAULT_ID_MIN)]
    pub id_min: u32,

    /// Upper end of the ID range for normal trices
    #[arg(long, alias = "IDMax", value_name = "ID", default_value_t = DEFAULT_ID_MAX)]
    pub id_max: u32,

    /// Lower end of the ID range for short trices
    #[arg(long, alias = "IDMinShort", value_name = "ID", default_value_t = DEFAULT_ID_MIN_SHORT)]
    pub id_min_short: u32,

    /// Upper end of the ID range for short trices
    #[arg(long, alias = "IDMaxShort", value_name = "ID", default_value_t = DEFAULT_ID_MAX_SHORT)]
    pub id_max_short: u32,

    /// How new IDs are searched for: random, upward or downward
    #[arg(long, alias = "IDMethod", value_name = "METHOD", default_value = "random")]
    pub id_method: SearchMethod,

    /// Extend macro names without `_<n>` by their parameter count
    #[arg(long, alias = "addParamCount")]
    pub add_param_count: bool,

    /// Reuse the ID of an equal format instead of allocating a new one
    #[arg(long, alias = "sharedIDs")]
    pub shared_ids: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ZeroArgs {
    /// Source directory or file, may be given several times
    #[arg(short = 's', long = "src", value_name = "PATH", required = true)]
    pub src: Vec<PathBuf>,

    /// Glob of files to skip, relative to each source root
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl SourceArgs {
    fn apply(self, config: &mut Config) {
        config.roots = self.src;
        config.exclude = self.exclude;
        config.dry_run = self.dry_run;
    }
}

impl ListArgs {
    fn into_config(self) -> Config {
        let mut config = Config {
            id_list: self.id_list,
            ..Config::default()
        };
        self.sources.apply(&mut config);
        config
    }
}

impl Command {
    /// The policy to run and its configuration
    pub fn into_config(self) -> Result<(Policy, Config)> {
        match self {
            Command::Renew(args) => Ok((Policy::Renew, args.into_config())),
            Command::Refresh(args) => Ok((Policy::Refresh, args.into_config())),
            Command::Update(args) => {
                let normal = IdRange::new(args.id_min, args.id_max)?;
                let short = IdRange::new(args.id_min_short, args.id_max_short)?;
                let config = Config {
                    normal,
                    short,
                    method: args.id_method,
                    add_param_count: args.add_param_count,
                    shared_ids: args.shared_ids,
                    ..args.list.into_config()
                };
                Ok((Policy::Update, config))
            }
            Command::Zero(args) => {
                let config = Config {
                    roots: args.src,
                    exclude: args.exclude,
                    dry_run: args.dry_run,
                    ..Config::default()
                };
                Ok((Policy::Zero, config))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> (Policy, Config) {
        let cli = Cli::try_parse_from(std::iter::once("trice").chain(args.iter().copied()))
            .unwrap_or_else(|e| panic!("{e}"));
        cli.command.into_config().unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_update_defaults() {
        let (policy, config) = parse(&["update"]);
        assert_eq!(policy, Policy::Update);
        assert_eq!(config.id_list, PathBuf::from("til.json"));
        assert_eq!(config.normal, IdRange::new(1000, 7999).unwrap());
        assert_eq!(config.short, IdRange::new(10, 999).unwrap());
        assert_eq!(config.method, SearchMethod::Random);
        assert!(!config.shared_ids);
        assert!(!config.add_param_count);
        assert!(config.roots.is_empty());
    }

    #[test]
    fn test_update_legacy_aliases() {
        let (policy, config) = parse(&[
            "u",
            "--src",
            "src",
            "-s",
            "lib/trice.c",
            "--til",
            "ids.json",
            "--IDMin",
            "40000",
            "--IDMax",
            "50000",
            "--IDMethod",
            "downward",
            "--sharedIDs",
            "--addParamCount",
            "--dry-run",
        ]);
        assert_eq!(policy, Policy::Update);
        assert_eq!(config.roots, [PathBuf::from("src"), PathBuf::from("lib/trice.c")]);
        assert_eq!(config.id_list, PathBuf::from("ids.json"));
        assert_eq!(config.normal, IdRange::new(40000, 50000).unwrap());
        assert_eq!(config.method, SearchMethod::Downward);
        assert!(config.shared_ids);
        assert!(config.add_param_count);
        assert!(config.dry_run);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = Cli::try_parse_from(["trice", "update", "--id-method", "sideways"]).unwrap_err();
        assert!(err.to_string().contains("sideways"), "{err}");
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let cli =
            Cli::try_parse_from(["trice", "update", "--id-min", "20", "--id-max", "10"]).unwrap();
        assert!(cli.command.into_config().is_err());
    }

    #[test]
    fn test_zero_needs_src() {
        assert!(Cli::try_parse_from(["trice", "zero"]).is_err());
        let (policy, config) = parse(&["zeroSourceTreeIds", "-s", "src"]);
        assert_eq!(policy, Policy::Zero);
        assert_eq!(config.roots, [PathBuf::from("src")]);
    }

    #[test]
    fn test_refresh_alias() {
        let (policy, config) = parse(&["r", "-i", "my.json", "--exclude", "vendor/**"]);
        assert_eq!(policy, Policy::Refresh);
        assert_eq!(config.id_list, PathBuf::from("my.json"));
        assert_eq!(config.exclude, ["vendor/**"]);
    }
}
