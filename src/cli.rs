use chatdriver_lib::Config;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chatdriver", version)]
#[command(about = "Drive a chat tab in an already running browser over the DevTools protocol")]
#[command(
    long_about = "Attaches to a browser started with --remote-debugging-port, finds the chat tab by URL, sends prompts one by one, waits for each reply to finish and saves the reply and any code artifact under the output directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: <config dir>/chatdriver/config.toml)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Remote debugging endpoint, http://host:port or ws://...
    #[clap(long, global = true)]
    pub debug_url: Option<String>,

    /// Substring of the chat tab's URL
    #[clap(long, global = true)]
    pub target_url: Option<String>,

    #[clap(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Selector set to use (built-in v1, v2, or one from the config file)
    #[clap(long, global = true)]
    pub selector_version: Option<String>,

    /// Debug logging
    #[clap(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a list of prompts, one turn each
    Run(RunArgs),
    /// Read one prompt from stdin and print the reply to stdout
    Ask(AskArgs),
    /// Print a selector set as TOML, ready to paste into the config file
    Selectors(SelectorsArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON array of strings, or text with prompts separated by `---` lines
    #[clap(long, short = 'f')]
    pub prompts: Option<PathBuf>,

    /// A prompt; repeat for several turns. Sent after those from --prompts.
    #[clap(long = "prompt", short = 'p')]
    pub prompt: Vec<String>,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Start a new chat before asking (default)
    #[clap(long, conflicts_with = "keep_chat")]
    pub new_chat: bool,

    /// Ask in the chat that is currently open
    #[clap(long)]
    pub keep_chat: bool,
}

#[derive(Args, Debug)]
pub struct SelectorsArgs {
    /// Version to print (default: the configured one)
    #[clap(long)]
    pub version: Option<String>,
}

impl Cli {
    /// Command-line flags win over the config file and environment.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.debug_url {
            config.connection.debug_url = url.clone();
        }
        if let Some(target) = &self.target_url {
            config.page.target_url = target.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(version) = &self.selector_version {
            config.selectors.version = version.clone();
        }
    }
}
