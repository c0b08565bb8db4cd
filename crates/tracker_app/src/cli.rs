use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracker_core::{FeatureKind, JobInput};

use crate::platform::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "tracker")]
#[command(about = "Submit generation jobs and follow them until they finish")]
pub struct Cli {
    /// RON config file (defaults to ./tracker.ron when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the backend base URL from the config
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Override where log output goes
    #[arg(long, value_enum, global = true)]
    pub log: Option<LogDestination>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a job and track it to completion
    Submit(SubmitArgs),

    /// List finished jobs
    History,

    /// List the available features and their polling settings
    Features,
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Feature slug, e.g. topic-short or map-tour
    #[arg(long, value_parser = parse_feature)]
    pub feature: FeatureKind,

    #[arg(long, default_value = "")]
    pub topic: String,

    /// Question or script id
    #[arg(long)]
    pub target_id: Option<String>,

    /// Supporting fact; repeat for several
    #[arg(long = "fact")]
    pub facts: Vec<String>,

    /// Retry failed jobs without asking
    #[arg(long)]
    pub yes: bool,
}

impl SubmitArgs {
    pub fn job_input(&self) -> JobInput {
        JobInput {
            topic: self.topic.clone(),
            target_id: self.target_id.clone(),
            facts: self.facts.clone(),
        }
    }
}

fn parse_feature(slug: &str) -> Result<FeatureKind, String> {
    FeatureKind::from_slug(slug).ok_or_else(|| {
        let known: Vec<&str> = FeatureKind::ALL.iter().map(|kind| kind.slug()).collect();
        format!("unknown feature '{slug}' (expected one of: {})", known.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn submit_collects_repeated_facts() {
        let cli = Cli::try_parse_from([
            "tracker",
            "submit",
            "--feature",
            "palace-animation",
            "--topic",
            "Mauryan Empire",
            "--fact",
            "Founded 322 BCE",
            "--fact",
            "Capital Pataliputra",
            "--yes",
        ])
        .unwrap();

        let Command::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.feature, FeatureKind::PalaceAnimation);
        assert!(args.yes);
        assert_eq!(
            args.job_input(),
            JobInput::topic("Mauryan Empire").with_facts(["Founded 322 BCE", "Capital Pataliputra"])
        );
    }

    #[test]
    fn unknown_feature_is_a_parse_error() {
        let err = Cli::try_parse_from(["tracker", "submit", "--feature", "essay"]).unwrap_err();
        assert!(err.to_string().contains("unknown feature 'essay'"));
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["tracker", "history", "--log", "terminal"]).unwrap();
        assert_eq!(cli.log, Some(LogDestination::Terminal));
        assert!(matches!(cli.command, Command::History));
    }
}
