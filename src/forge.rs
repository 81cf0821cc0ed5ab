//! Ties the generator to a renderer and keeps the recent-results history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::catalog::Template;
use crate::constants::HISTORY_CAPACITY;
use crate::error::MemeError;
use crate::gemini::TextModel;
use crate::generator::{CaptionGenerator, validate_topic};
use crate::render::{MemeImage, Renderer};

/// A finished meme and what it was made from.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedMeme {
    /// The image, local bytes or a remote URL.
    pub image: MemeImage,
    /// Template it was drawn on.
    pub template: Template,
    /// Trimmed topic the user asked for.
    pub source_topic: String,
    /// The model's one-liner on why it's funny.
    pub explanation: String,
    /// When rendering finished.
    pub created_at: DateTime<Utc>,
}

impl RenderedMeme {
    /// Download name, eg `memeforge-1760000000000.jpg`.
    pub fn file_name(&self) -> String {
        format!(
            "memeforge-{}.{}",
            self.created_at.timestamp_millis(),
            self.image.extension()
        )
    }
}

/// Most-recent-first list of memes with a fixed capacity.
#[derive(Clone, Debug)]
pub struct History {
    entries: VecDeque<RenderedMeme>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl History {
    /// Empty history holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds `meme` at the front, returning whatever fell off the back.
    pub fn push(&mut self, meme: RenderedMeme) -> Option<RenderedMeme> {
        self.entries.push_front(meme);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been rendered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &RenderedMeme> {
        self.entries.iter()
    }
}

/// Topic in, meme out. One generation at a time.
#[derive(Debug)]
pub struct MemeForge<M, R> {
    generator: CaptionGenerator<M>,
    renderer: R,
    history: RwLock<History>,
    in_flight: Mutex<()>,
}

impl<M: TextModel + Sync, R: Renderer + Sync> MemeForge<M, R> {
    /// Forge that always renders with `renderer`.
    pub fn new(generator: CaptionGenerator<M>, renderer: R) -> Self {
        Self {
            generator,
            renderer,
            history: RwLock::new(History::default()),
            in_flight: Mutex::new(()),
        }
    }

    /// The caption generator in use.
    pub fn generator(&self) -> &CaptionGenerator<M> {
        &self.generator
    }

    /// Generate and render a meme for `topic`, then record it.
    ///
    /// Fails with [`MemeError::Busy`] if another call is still running. On any
    /// failure the history is left untouched. Calling again for the same topic
    /// is an independent regeneration.
    pub async fn generate(&self, topic: &str) -> Result<RenderedMeme, MemeError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            return Err(MemeError::Busy);
        };
        let topic = validate_topic(topic)?;

        let meme = match self.run(topic).await {
            Ok(meme) => meme,
            Err(err) => {
                error!("Generating a meme for \"{}\" failed: {}", topic, err);
                return Err(err);
            }
        };

        let mut history = self.history.write().await;
        if let Some(evicted) = history.push(meme.clone()) {
            info!("History full, dropped meme for \"{}\"", evicted.source_topic);
        }
        Ok(meme)
    }

    async fn run(&self, topic: &str) -> Result<RenderedMeme, MemeError> {
        let result = self.generator.generate(topic).await?;
        let image = self.renderer.render(&result.template, &result.texts).await?;
        Ok(RenderedMeme {
            image,
            template: result.template,
            source_topic: topic.to_string(),
            explanation: result.explanation,
            created_at: Utc::now(),
        })
    }

    /// Snapshot of the history, newest first.
    pub async fn history(&self) -> Vec<RenderedMeme> {
        self.history.read().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::constants::SLOT_COUNT;
    use crate::generator::tests::ScriptedModel;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use url::Url;

    /// Hands out numbered URLs, or fails every call.
    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Renderer for CountingRenderer {
        async fn render(
            &self,
            template: &Template,
            _texts: &[String; SLOT_COUNT],
        ) -> Result<MemeImage, MemeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MemeError::RemoteService("Template not found".to_string()));
            }
            let url = format!("https://i.imgflip.com/{}-{call}.jpg", template.id);
            Url::parse(&url)
                .map(MemeImage::Remote)
                .map_err(|err| MemeError::RemoteService(err.to_string()))
        }
    }

    /// Blocks until released, so a second caller can observe the first in flight.
    struct GatedRenderer {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl Renderer for GatedRenderer {
        async fn render(
            &self,
            _template: &Template,
            _texts: &[String; SLOT_COUNT],
        ) -> Result<MemeImage, MemeError> {
            self.started.notify_one();
            self.release.notified().await;
            Url::parse("https://i.imgflip.com/gated.jpg")
                .map(MemeImage::Remote)
                .map_err(|err| MemeError::RemoteService(err.to_string()))
        }
    }

    const REPLY: &str = r#"{"templateIndex": 1, "text0": "A", "text1": "B", "explanation": "x"}"#;

    fn forge<R: Renderer + Sync>(reply: &str, renderer: R) -> MemeForge<ScriptedModel, R> {
        let generator = CaptionGenerator::new(
            ScriptedModel::replying(reply),
            Catalog::builtin().expect("builtin catalog"),
        );
        MemeForge::new(generator, renderer)
    }

    fn meme(topic: &str) -> RenderedMeme {
        RenderedMeme {
            image: MemeImage::Encoded {
                mime: "image/jpeg",
                bytes: Vec::new(),
            },
            template: Catalog::builtin().expect("catalog").fallback().clone(),
            source_topic: topic.to_string(),
            explanation: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn file_name_uses_timestamp() {
        let mut meme = meme("cats");
        meme.created_at = DateTime::from_timestamp_millis(1_760_000_000_123).expect("timestamp");
        assert_eq!(meme.file_name(), "memeforge-1760000000123.jpg");
    }

    #[test]
    fn history_evicts_oldest_first() {
        let mut history = History::default();
        for n in 0..6 {
            assert!(history.push(meme(&format!("topic {n}"))).is_none());
        }
        let evicted = history.push(meme("topic 6")).expect("eviction");
        assert_eq!(evicted.source_topic, "topic 0");
        let evicted = history.push(meme("topic 7")).expect("eviction");
        assert_eq!(evicted.source_topic, "topic 1");

        let topics: Vec<_> = history.iter().map(|m| m.source_topic.as_str()).collect();
        assert_eq!(
            topics,
            vec!["topic 7", "topic 6", "topic 5", "topic 4", "topic 3", "topic 2"]
        );
    }

    #[tokio::test]
    async fn successful_generations_fill_history_up_to_six() {
        let forge = forge(REPLY, CountingRenderer::default());
        for n in 0..10 {
            let meme = forge
                .generate(&format!("  topic {n} "))
                .await
                .expect("generate");
            assert_eq!(meme.source_topic, format!("topic {n}"));
            assert_eq!(meme.template.name, "Two Buttons");
            assert_eq!(meme.explanation, "x");
            assert!(forge.history().await.len() <= HISTORY_CAPACITY);
        }
        let history = forge.history().await;
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history[0].source_topic, "topic 9");
        assert_eq!(history[5].source_topic, "topic 4");
        assert_eq!(forge.renderer.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn failures_leave_history_alone() {
        let forge = forge(REPLY, CountingRenderer {
            fail: true,
            ..Default::default()
        });
        let err = forge.generate("cats").await.expect_err("renderer fails");
        assert!(matches!(err, MemeError::RemoteService(_)));
        assert!(forge.history().await.is_empty());

        let forge = self::forge("not json at all", CountingRenderer::default());
        let err = forge.generate("cats").await.expect_err("malformed");
        assert!(matches!(err, MemeError::MalformedResponse(_)));
        assert_eq!(forge.renderer.calls.load(Ordering::SeqCst), 0);
        assert!(forge.history().await.is_empty());

        let err = forge.generate("   ").await.expect_err("empty topic");
        assert!(matches!(err, MemeError::EmptyTopic));
        assert_eq!(
            forge.generator().catalog().len(),
            20,
            "catalog is untouched"
        );
    }

    #[tokio::test]
    async fn concurrent_generation_is_rejected() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let forge = Arc::new(forge(
            REPLY,
            GatedRenderer {
                started: started.clone(),
                release: release.clone(),
            },
        ));

        let first = tokio::spawn({
            let forge = forge.clone();
            async move { forge.generate("first").await }
        });
        started.notified().await;

        let err = forge.generate("second").await.expect_err("busy");
        assert!(matches!(err, MemeError::Busy));

        release.notify_one();
        let meme = first.await.expect("join").expect("first generation");
        assert_eq!(meme.source_topic, "first");

        let history = forge.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source_topic, "first");
    }
}
