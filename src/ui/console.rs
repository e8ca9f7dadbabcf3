use colored::Colorize;

use crate::config::Settings;
use crate::llm::RagAnswer;

pub struct Console;

impl Console {
    pub fn new() -> Self {
        Self
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", "[INFO]".blue(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "[ERROR]".red(), message);
    }

    /// Final user-facing message when there is no result to show.
    pub fn notice(&self, message: &str) {
        println!("{}", message.yellow());
    }

    /// Model output goes to stdout untouched.
    pub fn completion(&self, text: &str) {
        println!("{}", text);
    }

    pub fn rag_answer(&self, answer: &RagAnswer) {
        let rule = "=".repeat(30);
        println!("{}", rule);
        println!("{} {}", "Question:".yellow(), answer.question);
        println!("{} {}", "Answer:".green(), answer.answer);
        println!("{}", rule);

        for doc in &answer.sources {
            let page = doc
                .page()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!("{}", rule);
            println!("{}: {}\n", format!("Page {}", page).cyan(), doc.content);
            println!("{}", "+".repeat(30).dimmed());
        }
    }

    pub fn show_config(&self, settings: &Settings) {
        println!("\n{}", "CONFIGURATION".bold().underline());
        println!("{}", "─".repeat(50));

        println!("\n  {} {}", "Model:".yellow(), settings.model.green());
        println!("  {} {}", "Embedding model:".yellow(), settings.embedding_model);
        println!("  {} {}", "Base URL:".yellow(), settings.base_url().dimmed());
        println!("  {} {}", "Temperature:".yellow(), settings.temperature);
        println!(
            "  {} {}",
            "API key:".yellow(),
            if settings.get_api_key().is_some() {
                "resolved".green()
            } else {
                format!("missing (set {})", settings.api_key_env).red()
            }
        );
        match settings.request_timeout_secs {
            Some(secs) => println!("  {} {}s", "Request timeout:".yellow(), secs),
            None => println!("  {} {}", "Request timeout:".yellow(), "none".dimmed()),
        }

        let policy = settings.retry.policy();
        println!("\n  {}", "Retry Policy:".yellow());
        println!("    Max attempts: {}", policy.max_attempts);
        println!("    Wait between attempts: {:?}", policy.wait_interval);
        println!("    Pacing delay: {:?}", policy.pacing_delay);

        println!("\n  {}", "Retrieval:".yellow());
        println!("    Pages per answer: {}", settings.rag.top_k);
        println!("    Context limit: {} chars", settings.rag.max_context_chars);

        if let Ok(path) = Settings::config_path() {
            println!(
                "\n  {} {}",
                "Config file:".yellow(),
                path.display().to_string().dimmed()
            );
        }
        println!();
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
