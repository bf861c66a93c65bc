//! The `parley` command: compile a dialogue and play it in the terminal.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

pub mod play;
pub mod status;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emit {
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "parley", bin_name = "parley", version, about)]
pub struct Args {
    /// The dialogue document to play
    pub path: PathBuf,

    /// Print the disassembled program instead of playing it
    #[arg(long, conflicts_with_all = ["emit", "check"])]
    pub dump: bool,

    /// Print the program in a machine-readable format instead of playing it
    #[arg(long, value_enum, conflicts_with = "check")]
    pub emit: Option<Emit>,

    /// Only compile the document, reporting any errors
    #[arg(long)]
    pub check: bool,
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn arguments() {
        Args::command().debug_assert();

        let args = Args::parse_from(["parley", "story.md", "--emit", "json"]);
        assert_eq!(args.path, PathBuf::from("story.md"));
        assert_eq!(args.emit, Some(Emit::Json));
        assert!(!args.dump);

        assert!(Args::try_parse_from(["parley", "story.md", "--dump", "--check"]).is_err());
        assert!(Args::try_parse_from(["parley"]).is_err());
    }
}
