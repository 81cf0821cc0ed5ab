use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use memeforge::catalog::{Catalog, SUGGESTIONS};
use memeforge::cli::CliOptions;
use memeforge::config::{RendererKind, setup_logging};
use memeforge::font::FontPainter;
use memeforge::forge::{MemeForge, RenderedMeme};
use memeforge::gemini::GeminiModel;
use memeforge::generator::CaptionGenerator;
use memeforge::layout::LayoutEngine;
use memeforge::remote::RemoteCaptioner;
use memeforge::render::{MemeImage, Renderer};
use rand::seq::IndexedRandom;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        std::process::exit(1);
    }

    if let Err(err) = run(cli).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: CliOptions) -> Result<()> {
    let catalog = Catalog::builtin()?;

    if cli.list_templates {
        for (index, template) in catalog.list_templates().iter().enumerate() {
            println!(
                "{index:>2}  {:<36} {} slot(s)  {}",
                template.name, template.slot_count, template.image_url
            );
        }
        return Ok(());
    }

    let topic = match (&cli.topic, cli.suggest) {
        (Some(topic), _) => topic.clone(),
        (None, true) => SUGGESTIONS
            .choose(&mut rand::rng())
            .map(|topic| topic.to_string())
            .ok_or_else(|| anyhow!("No suggestions available"))?,
        (None, false) => {
            return Err(anyhow!("No topic given, pass one or use --suggest"));
        }
    };

    let api_key = cli
        .gemini_api_key
        .clone()
        .ok_or_else(|| anyhow!("A Gemini API key is required, set GEMINI_API_KEY"))?;
    let client = reqwest::Client::new();
    let model = GeminiModel::new(client.clone(), api_key)
        .with_model(&cli.model)
        .with_base_url(&cli.gemini_base_url);
    let generator = CaptionGenerator::new(model, catalog);

    info!("Rendering with the {} renderer", cli.renderer);
    match cli.renderer {
        RendererKind::Local => {
            let font_path = cli
                .font_path
                .clone()
                .ok_or_else(|| anyhow!("Local rendering needs a font, set MEMEFORGE_FONT_PATH"))?;
            let painter = FontPainter::from_path(&font_path).await?;
            let forge = MemeForge::new(generator, LayoutEngine::new(client, painter));
            generate_all(&forge, &topic, &cli).await
        }
        RendererKind::Remote => {
            let captioner = RemoteCaptioner::new(client)
                .with_credentials(&cli.imgflip_username, &cli.imgflip_password)
                .with_endpoint(&cli.imgflip_url);
            let forge = MemeForge::new(generator, captioner);
            generate_all(&forge, &topic, &cli).await
        }
    }
}

async fn generate_all<R: Renderer + Sync>(
    forge: &MemeForge<GeminiModel, R>,
    topic: &str,
    cli: &CliOptions,
) -> Result<()> {
    for attempt in 1..=cli.count.get() {
        let generation = forge.generate(topic);
        let meme = match cli.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), generation)
                .await
                .map_err(|_| anyhow!("Generation timed out after {secs}s"))??,
            None => generation.await?,
        };
        info!("Generation {} of {} done", attempt, cli.count);
        report(&meme, cli).await?;
    }

    let history = forge.history().await;
    if history.len() > 1 {
        println!("\nRecent memes:");
        for meme in &history {
            println!("  {:<24} {}", meme.source_topic, meme.template.name);
        }
    }
    Ok(())
}

async fn report(meme: &RenderedMeme, cli: &CliOptions) -> Result<()> {
    println!("Template: {}", meme.template.name);
    if !meme.explanation.is_empty() {
        println!("Why: {}", meme.explanation);
    }
    match &meme.image {
        MemeImage::Encoded { bytes, .. } => {
            tokio::fs::create_dir_all(&cli.out_dir)
                .await
                .with_context(|| format!("Failed to create {}", cli.out_dir.display()))?;
            let path = cli.out_dir.join(meme.file_name());
            tokio::fs::write(&path, bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved: {}", path.display());
        }
        MemeImage::Remote(url) => println!("Meme: {url}"),
    }
    Ok(())
}
