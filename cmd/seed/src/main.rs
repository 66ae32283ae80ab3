//! Fills a running board with demo ideas and threads through its HTTP API.

use anyhow::Context;
use board_client::{BoardApi, HttpBoardApi, IdeaDraft};
use clap::Parser;
use domains::Category;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Seed an idea board with demo data", long_about = None)]
struct Cli {
    /// Where the API is mounted
    #[arg(long, env = "IDEA_BOARD_URL", default_value = "http://127.0.0.1:8080/api")]
    base_url: String,

    /// Author name used for the demo messages
    #[arg(long, default_value = "Seeder")]
    author: String,
}

struct DemoIdea {
    title: &'static str,
    description: Option<&'static str>,
    category: Category,
    messages: &'static [&'static str],
}

const DEMO: &[DemoIdea] = &[
    DemoIdea {
        title: "Dark mode",
        description: Some("Follow the system theme"),
        category: Category::Working,
        messages: &["Started on the palette", "Contrast looks off on cards"],
    },
    DemoIdea {
        title: "Keyboard shortcuts",
        description: None,
        category: Category::Working,
        messages: &["n for new idea?"],
    },
    DemoIdea {
        title: "CSV export",
        description: Some("Dump the board for the weekly sync"),
        category: Category::Closed,
        messages: &["Shipped", "Thanks!"],
    },
    DemoIdea {
        title: "Voting on ideas",
        description: Some("Let people upvote cards"),
        category: Category::Future,
        messages: &[],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let api = HttpBoardApi::new(&cli.base_url).context("bad --base-url")?;

    for demo in DEMO {
        let idea = api
            .create_idea(IdeaDraft {
                title: demo.title.to_string(),
                description: demo.description.map(str::to_string),
                category: demo.category,
            })
            .await
            .with_context(|| format!("failed to create `{}`", demo.title))?;
        for text in demo.messages {
            api.post_message(idea.id, text.to_string(), Some(cli.author.clone()))
                .await
                .with_context(|| format!("failed to post to `{}`", demo.title))?;
        }
        tracing::info!(idea_id = %idea.id, title = demo.title, "seeded");
    }
    tracing::info!(count = DEMO.len(), base_url = %cli.base_url, "seeding done");
    Ok(())
}
