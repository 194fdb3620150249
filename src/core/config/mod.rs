//! core::config
//!
//! Action configuration: captured once, resolved once, passed explicitly.
//!
//! # Overview
//!
//! GitHub Actions hands inputs to a step through the environment
//! (`INPUT_<NAME>`) alongside runner variables such as `GITHUB_REF_NAME`.
//! [`EnvSnapshot::capture`] reads the process environment exactly once at
//! startup; everything downstream works from the snapshot, so nothing in
//! the push logic performs ad hoc environment lookups.
//!
//! # Precedence
//!
//! For each setting the first non-empty value wins:
//! 1. Command-line argument or flag
//! 2. Action input (`INPUT_*`)
//! 3. Plain environment variable (`BUF_TOKEN`, `GITHUB_TOKEN`, ...)
//! 4. Default value
//!
//! # Example
//!
//! ```
//! use bufpush::core::config::{ActionConfig, EnvSnapshot, Inputs};
//!
//! let env = EnvSnapshot::from_pairs([
//!     ("INPUT_BUF_TOKEN", "token"),
//!     ("INPUT_TRACK", "feature"),
//!     ("GITHUB_REF_NAME", "feature"),
//! ]);
//! let config = ActionConfig::resolve(&env, &Inputs::default()).unwrap();
//!
//! assert_eq!(config.track, "feature");
//! assert_eq!(config.default_branch, "main");
//! assert_eq!(config.input.to_str(), Some("."));
//! ```

pub mod lock;
pub mod schema;

pub use lock::{BufLock, ModulePin};
pub use schema::BufYaml;

use std::collections::BTreeMap;
use std::path::PathBuf;

use reqwest::Url;
use thiserror::Error;

use crate::core::types::{Secret, TypeError};

/// Default GitHub REST API base URL.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default value of the `default_branch` input.
pub const DEFAULT_BRANCH: &str = "main";

/// Default value of the `input` input.
pub const DEFAULT_INPUT: &str = ".";

/// Environment keys read by the action.
pub mod keys {
    pub const INPUT_BUF_TOKEN: &str = "INPUT_BUF_TOKEN";
    pub const INPUT_INPUT: &str = "INPUT_INPUT";
    pub const INPUT_TRACK: &str = "INPUT_TRACK";
    pub const INPUT_DEFAULT_BRANCH: &str = "INPUT_DEFAULT_BRANCH";
    pub const INPUT_GITHUB_TOKEN: &str = "INPUT_GITHUB_TOKEN";
    pub const BUF_TOKEN: &str = "BUF_TOKEN";
    pub const BUF_API_URL: &str = "BUF_API_URL";
    pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
    pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
    pub const GITHUB_REF_NAME: &str = "GITHUB_REF_NAME";
    pub const GITHUB_API_URL: &str = "GITHUB_API_URL";
    pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";
    pub const RUNNER_DEBUG: &str = "RUNNER_DEBUG";
}

/// Errors from configuration resolution and module config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("a buf authentication token was not provided")]
    MissingBufToken,

    #[error("github_token is empty")]
    MissingGitHubToken,

    #[error("GITHUB_REPOSITORY is empty")]
    MissingRepository,

    #[error("GITHUB_REPOSITORY is not in the format owner/repo")]
    InvalidRepository,

    #[error("github.sha is empty")]
    MissingCommit,

    #[error("track not provided")]
    MissingTrack,

    #[error("invalid {key} {value:?}: {message}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        message: String,
    },

    #[error("config file not found: {0}")]
    ModuleConfigNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("module identity not found in config")]
    MissingModuleName,

    #[error(transparent)]
    InvalidModuleName(#[from] TypeError),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Immutable copy of the process environment taken at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build a snapshot from explicit pairs (tests, embedding).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a variable. Empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// The first non-empty value among `keys`.
    pub fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Whether the runner asked for debug logging (`RUNNER_DEBUG=1`).
    pub fn runner_debug(&self) -> bool {
        self.get(keys::RUNNER_DEBUG) == Some("1")
    }
}

/// Values supplied on the command line.
///
/// Empty strings count as unset, except for `ref_name`: an explicit empty
/// ref name means "unknown" and does not fall back to `GITHUB_REF_NAME`.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub input: Option<String>,
    pub track: Option<String>,
    pub default_branch: Option<String>,
    pub ref_name: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct ActionConfig {
    /// Registry credential.
    pub buf_token: Secret,
    /// Directory holding the module (and its `buf.yaml`).
    pub input: PathBuf,
    /// Requested track, before default-branch resolution.
    pub track: String,
    /// Repository's default branch.
    pub default_branch: String,
    /// Ref that triggered the workflow; empty when unknown.
    pub ref_name: String,
    /// Registry API base override. `None` derives it from the module remote.
    pub registry_api_base: Option<String>,
    /// File that step outputs are appended to.
    pub output_file: Option<PathBuf>,
}

impl ActionConfig {
    /// Resolve shared settings from the command line and environment.
    ///
    /// # Errors
    ///
    /// - `MissingBufToken` if no registry token is available
    /// - `MissingTrack` if neither a track nor a ref name is available
    /// - `InvalidUrl` if `BUF_API_URL` is set but unparseable
    pub fn resolve(env: &EnvSnapshot, inputs: &Inputs) -> Result<Self, ConfigError> {
        let buf_token = env
            .first(&[keys::INPUT_BUF_TOKEN, keys::BUF_TOKEN])
            .map(Secret::new)
            .ok_or(ConfigError::MissingBufToken)?;

        // A ref name given on the command line is final, even when empty.
        let ref_name = match &inputs.ref_name {
            Some(ref_name) => ref_name.trim().to_string(),
            None => env.get(keys::GITHUB_REF_NAME).unwrap_or_default().to_string(),
        };

        // The track input defaults to the triggering ref.
        let track = non_empty(&inputs.track)
            .or_else(|| env.get(keys::INPUT_TRACK))
            .or(Some(ref_name.as_str()).filter(|r| !r.is_empty()))
            .ok_or(ConfigError::MissingTrack)?
            .to_string();

        let default_branch = non_empty(&inputs.default_branch)
            .or_else(|| env.get(keys::INPUT_DEFAULT_BRANCH))
            .unwrap_or(DEFAULT_BRANCH)
            .to_string();

        let input = PathBuf::from(
            non_empty(&inputs.input)
                .or_else(|| env.get(keys::INPUT_INPUT))
                .unwrap_or(DEFAULT_INPUT),
        );

        let registry_api_base = env
            .get(keys::BUF_API_URL)
            .map(|url| validate_url(keys::BUF_API_URL, url))
            .transpose()?;

        Ok(Self {
            buf_token,
            input,
            track,
            default_branch,
            ref_name,
            registry_api_base,
            output_file: env.get(keys::GITHUB_OUTPUT).map(PathBuf::from),
        })
    }
}

/// Settings for the GitHub commit comparison API.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: Secret,
    pub owner: String,
    pub repo: String,
    pub api_base: String,
}

impl GitHubConfig {
    /// Resolve GitHub settings from the environment.
    ///
    /// # Errors
    ///
    /// - `MissingGitHubToken` if no token is available
    /// - `MissingRepository` / `InvalidRepository` for a bad `GITHUB_REPOSITORY`
    /// - `InvalidUrl` if `GITHUB_API_URL` is set but unparseable
    pub fn resolve(env: &EnvSnapshot) -> Result<Self, ConfigError> {
        let token = env
            .first(&[keys::INPUT_GITHUB_TOKEN, keys::GITHUB_TOKEN])
            .map(Secret::new)
            .ok_or(ConfigError::MissingGitHubToken)?;

        let repository = env
            .get(keys::GITHUB_REPOSITORY)
            .ok_or(ConfigError::MissingRepository)?;
        let (owner, repo) = match repository.split('/').collect::<Vec<_>>().as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
                (owner.to_string(), repo.to_string())
            }
            _ => return Err(ConfigError::InvalidRepository),
        };

        let api_base = match env.get(keys::GITHUB_API_URL) {
            Some(url) => validate_url(keys::GITHUB_API_URL, url)?,
            None => DEFAULT_GITHUB_API_URL.to_string(),
        };

        Ok(Self {
            token,
            owner,
            repo,
            api_base,
        })
    }
}

/// Check that the current git commit was supplied.
pub fn require_commit(commit: &str) -> Result<&str, ConfigError> {
    let commit = commit.trim();
    if commit.is_empty() {
        return Err(ConfigError::MissingCommit);
    }
    Ok(commit)
}

/// Parse a URL setting, returning it without a trailing slash.
fn validate_url(key: &'static str, value: &str) -> Result<String, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
        message: e.to_string(),
    })?;
    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (keys::INPUT_BUF_TOKEN, "buf-token"),
            (keys::INPUT_TRACK, "non-main"),
            (keys::INPUT_DEFAULT_BRANCH, "main"),
            (keys::GITHUB_REF_NAME, "main"),
            (keys::GITHUB_TOKEN, "gh-token"),
            (keys::GITHUB_REPOSITORY, "octocat/hello"),
        ]
    }

    fn env_with(overrides: &[(&'static str, &'static str)]) -> EnvSnapshot {
        let mut pairs: BTreeMap<&str, &str> = base_env().into_iter().collect();
        for (k, v) in overrides {
            pairs.insert(*k, *v);
        }
        EnvSnapshot::from_pairs(pairs)
    }

    mod action_config {
        use super::*;

        #[test]
        fn resolves_from_inputs_env() {
            let config = ActionConfig::resolve(&env_with(&[]), &Inputs::default()).unwrap();
            assert_eq!(config.buf_token.expose(), "buf-token");
            assert_eq!(config.track, "non-main");
            assert_eq!(config.default_branch, "main");
            assert_eq!(config.ref_name, "main");
            assert_eq!(config.input, PathBuf::from("."));
            assert!(config.registry_api_base.is_none());
            assert!(config.output_file.is_none());
        }

        #[test]
        fn cli_inputs_take_precedence() {
            let inputs = Inputs {
                input: Some("proto".into()),
                track: Some("cli-track".into()),
                default_branch: Some("master".into()),
                ref_name: Some("cli-ref".into()),
            };
            let config = ActionConfig::resolve(&env_with(&[]), &inputs).unwrap();
            assert_eq!(config.input, PathBuf::from("proto"));
            assert_eq!(config.track, "cli-track");
            assert_eq!(config.default_branch, "master");
            assert_eq!(config.ref_name, "cli-ref");
        }

        #[test]
        fn empty_cli_inputs_fall_through() {
            let inputs = Inputs {
                track: Some(String::new()),
                default_branch: Some(String::new()),
                ..Inputs::default()
            };
            let config = ActionConfig::resolve(&env_with(&[]), &inputs).unwrap();
            assert_eq!(config.track, "non-main");
            assert_eq!(config.default_branch, "main");
        }

        #[test]
        fn buf_token_falls_back_to_plain_env() {
            let env = env_with(&[(keys::INPUT_BUF_TOKEN, ""), (keys::BUF_TOKEN, "plain")]);
            let config = ActionConfig::resolve(&env, &Inputs::default()).unwrap();
            assert_eq!(config.buf_token.expose(), "plain");
        }

        #[test]
        fn missing_buf_token() {
            let env = env_with(&[(keys::INPUT_BUF_TOKEN, "")]);
            let err = ActionConfig::resolve(&env, &Inputs::default()).unwrap_err();
            assert_eq!(err.to_string(), "a buf authentication token was not provided");
        }

        #[test]
        fn track_defaults_to_ref_name() {
            let env = env_with(&[(keys::INPUT_TRACK, ""), (keys::GITHUB_REF_NAME, "feature")]);
            let config = ActionConfig::resolve(&env, &Inputs::default()).unwrap();
            assert_eq!(config.track, "feature");
        }

        #[test]
        fn explicit_empty_ref_name_is_final() {
            let env = env_with(&[(keys::GITHUB_REF_NAME, "feature")]);
            let inputs = Inputs {
                track: Some("master".into()),
                ref_name: Some(String::new()),
                ..Inputs::default()
            };
            let config = ActionConfig::resolve(&env, &inputs).unwrap();
            assert_eq!(config.ref_name, "");

            let config = ActionConfig::resolve(&env, &Inputs::default()).unwrap();
            assert_eq!(config.ref_name, "feature");
        }

        #[test]
        fn missing_track() {
            let env = env_with(&[(keys::INPUT_TRACK, ""), (keys::GITHUB_REF_NAME, "")]);
            let err = ActionConfig::resolve(&env, &Inputs::default()).unwrap_err();
            assert_eq!(err.to_string(), "track not provided");
        }

        #[test]
        fn registry_api_override() {
            let env = env_with(&[(keys::BUF_API_URL, "http://localhost:8080/")]);
            let config = ActionConfig::resolve(&env, &Inputs::default()).unwrap();
            assert_eq!(
                config.registry_api_base.as_deref(),
                Some("http://localhost:8080")
            );
        }

        #[test]
        fn invalid_registry_api_url() {
            let env = env_with(&[(keys::BUF_API_URL, ":foo")]);
            let err = ActionConfig::resolve(&env, &Inputs::default()).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidUrl { key, .. } if key == keys::BUF_API_URL));
        }
    }

    mod github_config {
        use super::*;

        #[test]
        fn resolves_repository() {
            let config = GitHubConfig::resolve(&env_with(&[])).unwrap();
            assert_eq!(config.owner, "octocat");
            assert_eq!(config.repo, "hello");
            assert_eq!(config.api_base, DEFAULT_GITHUB_API_URL);
        }

        #[test]
        fn input_token_preferred() {
            let env = env_with(&[(keys::INPUT_GITHUB_TOKEN, "input-token")]);
            let config = GitHubConfig::resolve(&env).unwrap();
            assert_eq!(config.token.expose(), "input-token");
        }

        #[test]
        fn missing_token() {
            let env = env_with(&[(keys::GITHUB_TOKEN, "")]);
            let err = GitHubConfig::resolve(&env).unwrap_err();
            assert_eq!(err.to_string(), "github_token is empty");
        }

        #[test]
        fn missing_repository() {
            let env = env_with(&[(keys::GITHUB_REPOSITORY, "")]);
            let err = GitHubConfig::resolve(&env).unwrap_err();
            assert_eq!(err.to_string(), "GITHUB_REPOSITORY is empty");
        }

        #[test]
        fn invalid_repository_format() {
            for bad in ["invalid", "a/b/c", "/repo", "owner/"] {
                let env = EnvSnapshot::from_pairs([
                    (keys::GITHUB_TOKEN, "t"),
                    (keys::GITHUB_REPOSITORY, bad),
                ]);
                let err = GitHubConfig::resolve(&env).unwrap_err();
                assert_eq!(
                    err.to_string(),
                    "GITHUB_REPOSITORY is not in the format owner/repo",
                    "input: {bad}"
                );
            }
        }

        #[test]
        fn unparseable_api_url() {
            let env = env_with(&[(keys::GITHUB_API_URL, ":foo")]);
            let err = GitHubConfig::resolve(&env).unwrap_err();
            assert!(err.to_string().contains("GITHUB_API_URL"));
        }

        #[test]
        fn enterprise_api_url() {
            let env = env_with(&[(keys::GITHUB_API_URL, "https://ghe.example.com/api/v3/")]);
            let config = GitHubConfig::resolve(&env).unwrap();
            assert_eq!(config.api_base, "https://ghe.example.com/api/v3");
        }
    }

    #[test]
    fn require_commit_rejects_empty() {
        assert_eq!(
            require_commit("").unwrap_err().to_string(),
            "github.sha is empty"
        );
        assert_eq!(require_commit(" abc ").unwrap(), "abc");
    }

    #[test]
    fn env_snapshot_treats_empty_as_unset() {
        let env = EnvSnapshot::from_pairs([("A", ""), ("B", "b")]);
        assert_eq!(env.get("A"), None);
        assert_eq!(env.first(&["A", "B"]), Some("b"));
        assert!(!env.runner_debug());
        assert!(EnvSnapshot::from_pairs([(keys::RUNNER_DEBUG, "1")]).runner_debug());
    }
}
