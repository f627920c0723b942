use clap::{Args, Parser, Subcommand, ValueEnum};
use memora_core::MergeMode;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Add,
    Override,
}

impl From<ModeArg> for MergeMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Add => MergeMode::Add,
            ModeArg::Override => MergeMode::Override,
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(name = "memora", version, about = "Memora lesson tooling")]
pub struct Cli {
    /// Backend base URL
    #[arg(long, env = "MEMORA_API_URL", default_value = memora_http::DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Bearer token (overrides the stored one)
    #[arg(long, env = "MEMORA_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Use an in-memory backend; nothing leaves the machine
    #[arg(long)]
    pub offline: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Store a bearer token for later runs
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forget the stored token
    Logout,
    /// Upload one image and print its public URL
    Upload(UploadCmd),
    /// Ask the AI service to fill in words
    Autofill { words: Vec<String> },
    /// Card list operations on a JSON card file
    #[command(subcommand)]
    Cards(CardsCmd),
    /// Lesson operations
    #[command(subcommand)]
    Lesson(LessonCmd),
}

#[derive(Debug, Args, Clone)]
pub struct UploadCmd {
    pub path: PathBuf,
    #[arg(long, default_value = memora_core::DEFAULT_PREFIX)]
    pub prefix: String,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CardsCmd {
    /// Add or replace cards from a word list and autofill them
    Merge(MergeCmd),
    /// Autofill cards already in the file
    Fill {
        #[arg(long)]
        cards: PathBuf,
        /// Only this card (0-based)
        #[arg(long)]
        index: Option<usize>,
    },
    ImportCsv {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    ExportCsv {
        #[arg(long)]
        cards: PathBuf,
        #[arg(long)]
        csv: PathBuf,
    },
}

#[derive(Debug, Args, Clone)]
pub struct MergeCmd {
    #[arg(long)]
    pub cards: PathBuf,
    /// Whitespace-separated words
    #[arg(long)]
    pub words: String,
    #[arg(long, value_enum, default_value_t = ModeArg::Add)]
    pub mode: ModeArg,
    /// Write here instead of back to --cards
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum LessonCmd {
    Show { id: i64 },
    /// Fetch a lesson into an editable draft file
    Pull {
        id: i64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Upload pending images and create or update the lesson
    Push(PushCmd),
}

#[derive(Debug, Args, Clone)]
pub struct PushCmd {
    #[arg(long)]
    pub draft: PathBuf,
    /// Create the lesson in this chapter
    #[arg(long, conflicts_with = "lesson", required_unless_present = "lesson")]
    pub chapter: Option<i64>,
    /// Update this existing lesson
    #[arg(long)]
    pub lesson: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_needs_exactly_one_target() {
        assert!(Cli::try_parse_from(["memora", "lesson", "push", "--draft", "d.json"]).is_err());
        assert!(Cli::try_parse_from([
            "memora", "lesson", "push", "--draft", "d.json", "--chapter", "1", "--lesson", "2",
        ])
        .is_err());
        let cli = Cli::try_parse_from(["memora", "lesson", "push", "--draft", "d.json", "--lesson", "2"]).unwrap();
        assert!(matches!(cli.cmd, Command::Lesson(LessonCmd::Push(PushCmd { lesson: Some(2), .. }))));
    }

    #[test]
    fn merge_mode_parses() {
        let cli = Cli::try_parse_from([
            "memora", "--offline", "cards", "merge", "--cards", "c.json", "--words", "a b", "--mode", "override",
        ])
        .unwrap();
        assert!(cli.offline);
        let Command::Cards(CardsCmd::Merge(m)) = cli.cmd else {
            panic!("expected merge");
        };
        assert_eq!(MergeMode::from(m.mode), MergeMode::Override);
        assert_eq!(m.words, "a b");
    }
}
