use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "studio", version, about = "Publish channel snapshots into export databases")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON). Defaults to the user config directory.
    #[arg(long, short, global = true, env = "STUDIO_CONFIG")]
    pub config: Option<PathBuf>,
    /// Log more; repeat for trace output.
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Publish a channel snapshot and write the updated snapshot back.
    Publish(PublishArgs),
    /// Build the Perseus archive of a single exercise.
    Exercise(ExerciseArgs),
}

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Channel snapshot exported from the authoring store.
    #[arg(long, short)]
    pub snapshot: PathBuf,
    /// Publish even if no node changed.
    #[arg(long)]
    pub force: bool,
    /// Rebuild every exercise archive.
    #[arg(long)]
    pub force_exercises: bool,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Debug, Args)]
pub struct ExerciseArgs {
    #[arg(long, short)]
    pub snapshot: PathBuf,
    /// Authoring id of the exercise node.
    #[arg(long)]
    pub node: String,
    #[arg(long, short)]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_publish_arguments() {
        let cli = Cli::parse_from(["studio", "publish", "-s", "channel.json", "--force", "--notes", "Fixes", "-vv"]);
        assert_eq!(cli.verbose, 2);
        let Command::Publish(args) = cli.command else {
            panic!("expected publish");
        };
        assert_eq!(args.snapshot, PathBuf::from("channel.json"));
        assert!(args.force);
        assert!(!args.force_exercises);
        assert_eq!(args.notes, "Fixes");
    }

    #[test]
    fn test_exercise_requires_node() {
        assert!(Cli::try_parse_from(["studio", "exercise", "-s", "channel.json", "-o", "out.perseus"]).is_err());
    }
}
