use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Load `.env` files before clap reads credentials and endpoints from the
/// environment. Variables already set in the process always win.
pub fn bootstrap_from_args(args: &[OsString]) -> Result<()> {
    let explicit_env_file = extract_env_file_arg(args);
    load_env(explicit_env_file.as_ref())
}

pub fn load_env(explicit_env_file: Option<&PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let mut loaded = HashMap::new();

    for env_file in resolve_env_files(&cwd, explicit_env_file) {
        if !env_file.exists() && explicit_env_file.is_none() {
            continue;
        }

        let parsed = dotenvy::from_path_iter(&env_file)
            .with_context(|| format!("failed to read env file {}", env_file.display()))?;
        for item in parsed {
            let (key, value) =
                item.with_context(|| format!("failed to parse env file {}", env_file.display()))?;
            if std::env::var_os(&key).is_some() {
                continue;
            }
            // .env.local overrides .env
            loaded.insert(key, value);
        }
    }

    let mut envs: Vec<(String, String)> = loaded.into_iter().collect();
    envs.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in envs {
        std::env::set_var(key, value);
    }
    Ok(())
}

fn extract_env_file_arg(args: &[OsString]) -> Option<PathBuf> {
    let mut explicit = None;
    let mut idx = 1usize;
    while idx < args.len() {
        let Some(arg) = args[idx].to_str() else {
            idx += 1;
            continue;
        };

        if arg == "--" {
            break;
        }

        if arg == "--env-file" {
            if let Some(next) = args.get(idx + 1) {
                explicit = Some(PathBuf::from(next));
            }
            idx += 2;
            continue;
        }

        if let Some(value) = arg.strip_prefix("--env-file=") {
            explicit = Some(PathBuf::from(value));
        }

        idx += 1;
    }
    explicit
}

fn resolve_env_files(cwd: &Path, explicit_env_file: Option<&PathBuf>) -> Vec<PathBuf> {
    match explicit_env_file {
        Some(path) if path.is_absolute() => vec![path.clone()],
        Some(path) => vec![cwd.join(path)],
        None => vec![cwd.join(".env"), cwd.join(".env.local")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn finds_env_file_in_both_spellings() {
        assert_eq!(
            extract_env_file_arg(&argv(&["actiontool", "--env-file", "prod.env", "observations"])),
            Some(PathBuf::from("prod.env"))
        );
        assert_eq!(
            extract_env_file_arg(&argv(&["actiontool", "--env-file=prod.env"])),
            Some(PathBuf::from("prod.env"))
        );
    }

    #[test]
    fn stops_at_double_dash() {
        assert_eq!(
            extract_env_file_arg(&argv(&["actiontool", "--", "--env-file", "x.env"])),
            None
        );
    }

    #[test]
    fn default_files_are_relative_to_cwd() {
        let files = resolve_env_files(Path::new("/work"), None);
        assert_eq!(
            files,
            vec![PathBuf::from("/work/.env"), PathBuf::from("/work/.env.local")]
        );
    }
}
