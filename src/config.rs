//! Config handling

use clap::ValueEnum;
use tracing::log::LevelFilter;

/// Which renderer turns captions into an image.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum RendererKind {
    /// Composite the captions here, with a local font.
    #[default]
    Local,
    /// Let imgflip draw the captions and hand back a URL.
    Remote,
}

impl std::fmt::Display for RendererKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("reqwest", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_kind_parses_from_cli_values() {
        assert_eq!(
            RendererKind::from_str("remote", true).expect("parse"),
            RendererKind::Remote
        );
        assert_eq!(RendererKind::default(), RendererKind::Local);
        assert_eq!(RendererKind::Local.to_string(), "local");
    }

    #[test]
    fn logging_can_only_be_set_up_once() {
        let first = setup_logging(true);
        let second = setup_logging(true);
        // another test may have won the race for the first init
        assert!(first.is_ok() || second.is_err());
        assert!(second.is_err());
    }
}
