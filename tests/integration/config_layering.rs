//! Configuration layering across global file, explicit file, and environment.

use gist::config::{ConfigLoader, ProviderKind};
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that change process environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, &str)]) -> Self {
        let saved = vars
            .iter()
            .map(|(k, v)| {
                let old = std::env::var(k).ok();
                std::env::set_var(k, v);
                (*k, old)
            })
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in &self.saved {
            match old {
                Some(v) => std::env::set_var(k, v),
                None => std::env::remove_var(k),
            }
        }
    }
}

#[test]
fn test_sources_apply_in_precedence_order() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let xdg = TempDir::new().unwrap();
    fs::create_dir_all(xdg.path().join("gist")).unwrap();
    fs::write(
        xdg.path().join("gist/config.toml"),
        "language = \"English\"\nworkers = 3\n[prompt]\nmax_content_length = 3000\n",
    )
    .unwrap();
    let explicit = xdg.path().join("run.toml");
    fs::write(&explicit, "workers = 5\n[provider]\nkind = \"ollama\"\n").unwrap();

    let config = {
        let _env = EnvGuard::set(&[
            ("XDG_CONFIG_HOME", xdg.path().to_str().unwrap()),
            ("GIST_PROMPT__MAX_CONTENT_LENGTH", "2500"),
            ("MODEL_NAME", "qwen2.5:7b"),
        ]);
        ConfigLoader::load(Some(&explicit)).unwrap()
    };

    assert_eq!(config.language, "English");
    assert_eq!(config.workers, 5);
    assert_eq!(config.provider.kind, ProviderKind::Ollama);
    assert_eq!(config.prompt.max_content_length, 2500);
    assert_eq!(config.provider.model, "qwen2.5:7b");
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_values_are_all_reported() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let explicit = dir.path().join("bad.toml");
    fs::write(
        &explicit,
        "workers = 0\n[retry]\nmax_attempts = 0\nshrink_factor = 1.0\n",
    )
    .unwrap();
    let config = ConfigLoader::load_from_file(&explicit).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 3);
}
