use clap::{Parser, Subcommand};

pub const EXAMPLE_PROMPT: &str = "What are request rate limits?";
pub const EXAMPLE_RAG_QUERY: &str = "Romeo gets poisoned";

#[derive(Parser)]
#[command(name = "promptly")]
#[command(author = "Promptly Team")]
#[command(version)]
#[command(about = "Gemini completions with rate-limit aware retries", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get a completion, retrying while the API reports rate limiting
    Complete {
        /// The prompt to send
        #[arg(required = true)]
        prompt: String,
    },

    /// Send a prompt once, without pacing or retries
    Ask {
        /// The prompt to send
        #[arg(required = true)]
        prompt: String,
    },

    /// Answer a question from the pages of a PDF
    Rag {
        /// PDF file to index
        #[arg(required = true)]
        pdf: String,

        /// Question to answer
        #[arg(short, long, default_value = EXAMPLE_RAG_QUERY)]
        query: String,

        /// Number of pages to retrieve (overrides config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show current configuration
    Config,
}
