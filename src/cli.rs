//! CLI parser
use clap::Parser;
use std::num::NonZeroU32;
use std::path::PathBuf;

use crate::config::RendererKind;
use crate::constants::{
    DEFAULT_GEMINI_MODEL, GEMINI_API_BASE, IMGFLIP_CAPTION_URL, IMGFLIP_DEFAULT_PASSWORD,
    IMGFLIP_DEFAULT_USERNAME,
};

#[derive(Parser, Debug)]
#[command(name = "memeforge")]
#[command(about = "Drop a topic. Get a meme.")]
/// CLI Options
pub struct CliOptions {
    /// What the meme is about, eg "Monday mornings".
    pub topic: Option<String>,

    #[clap(long, help = "Enable debug logging", env = "MEMEFORGE_DEBUG")]
    /// Enable debug logging. Env: MEMEFORGE_DEBUG
    pub debug: bool,

    #[clap(long, value_enum, default_value_t = RendererKind::Local, env = "MEMEFORGE_RENDERER")]
    /// Where captions get drawn, `local` or `remote` (imgflip).
    /// Env: MEMEFORGE_RENDERER
    pub renderer: RendererKind,

    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    /// Gemini API key. Env: GEMINI_API_KEY
    pub gemini_api_key: Option<String>,

    #[clap(long, default_value = DEFAULT_GEMINI_MODEL, env = "MEMEFORGE_MODEL")]
    /// Gemini model used to write captions. Env: MEMEFORGE_MODEL
    pub model: String,

    #[clap(long, default_value = GEMINI_API_BASE, env = "MEMEFORGE_GEMINI_BASE_URL")]
    /// Gemini API base URL. Env: MEMEFORGE_GEMINI_BASE_URL
    pub gemini_base_url: String,

    #[clap(long, env = "MEMEFORGE_FONT_PATH")]
    /// TrueType font for local rendering, eg `/usr/share/fonts/Anton-Regular.ttf`.
    /// Env: MEMEFORGE_FONT_PATH
    pub font_path: Option<PathBuf>,

    #[clap(long, default_value = IMGFLIP_CAPTION_URL, env = "MEMEFORGE_IMGFLIP_URL")]
    /// Imgflip caption endpoint. Env: MEMEFORGE_IMGFLIP_URL
    pub imgflip_url: String,

    #[clap(long, default_value = IMGFLIP_DEFAULT_USERNAME, env = "IMGFLIP_USERNAME")]
    /// Imgflip username. Env: IMGFLIP_USERNAME
    pub imgflip_username: String,

    #[clap(
        long,
        default_value = IMGFLIP_DEFAULT_PASSWORD,
        env = "IMGFLIP_PASSWORD",
        hide_env_values = true
    )]
    /// Imgflip password. Env: IMGFLIP_PASSWORD
    pub imgflip_password: String,

    #[clap(long, short, default_value = ".", env = "MEMEFORGE_OUT_DIR")]
    /// Where locally rendered memes are saved. Env: MEMEFORGE_OUT_DIR
    pub out_dir: PathBuf,

    #[clap(long, short, default_value = "1")]
    /// How many times to generate, each one independent.
    pub count: NonZeroU32,

    #[clap(long, env = "MEMEFORGE_TIMEOUT_SECS")]
    /// Give up on a generation after this many seconds. Env: MEMEFORGE_TIMEOUT_SECS
    pub timeout_secs: Option<u64>,

    #[clap(long)]
    /// Print the template catalog and exit.
    pub list_templates: bool,

    #[clap(long)]
    /// Pick a random suggested topic when none is given.
    pub suggest: bool,
}
