//! Configuration types for resolved CLI arguments.

use crate::cli::{ModelArgs, ModelSource};
use eyre::Result;
use hf_hub::Cache;
use hf_hub::api::sync::Api;
use murmur_asr::types::ModelRepo;
use std::path::PathBuf;

/// Resolved model configuration.
///
/// Converted from ModelArgs via TryFrom.
#[derive(Debug)]
pub struct ModelConfig {
    pub repo: ModelRepo,
}

impl TryFrom<ModelArgs> for ModelConfig {
    type Error = eyre::Error;

    fn try_from(args: ModelArgs) -> Result<Self> {
        let repo = match args.model_source {
            ModelSource::Auto => {
                let path = PathBuf::from(&args.model_id);
                if path.is_dir() {
                    ModelRepo::Path(path)
                } else {
                    tracing::debug!(model = %args.model_id, "no local directory, using hub");
                    ModelRepo::Api(Api::new()?.model(args.model_id))
                }
            }
            ModelSource::Path => ModelRepo::Path(PathBuf::from(args.model_id)),
            ModelSource::Cache => ModelRepo::Cache(Cache::from_env().model(args.model_id)),
            ModelSource::Api => ModelRepo::Api(Api::new()?.model(args.model_id)),
        };

        Ok(Self { repo })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_prefers_existing_directory() {
        let dir = std::env::temp_dir();
        let args = ModelArgs {
            model_id: dir.to_string_lossy().into_owned(),
            model_source: ModelSource::Auto,
        };

        let config = ModelConfig::try_from(args).unwrap();

        assert!(matches!(config.repo, ModelRepo::Path(path) if path == dir));
    }

    #[test]
    fn explicit_path_is_not_checked() {
        let args = ModelArgs {
            model_id: "does/not/exist".into(),
            model_source: ModelSource::Path,
        };

        let config = ModelConfig::try_from(args).unwrap();

        assert!(matches!(config.repo, ModelRepo::Path(_)));
    }
}
