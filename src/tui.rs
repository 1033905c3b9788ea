use crate::catalog::{Catalog, FilterTuning};
use crate::cli::{
    AppConfig, DEFAULT_STAGES, DEFAULT_TIMEOUT_SECS, default_output_root, default_stage_names,
    normalize_extensions, timeout_from_secs, validate_stage_names,
};
use crate::filters::{
    self, validate_brightness_delta, validate_noise_strength, validate_positive_px,
    validate_probability,
};
use crate::orchestrator::DEFAULT_PROBABILITY;
use anyhow::Result;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::path::PathBuf;
use std::str::FromStr;

pub fn interactive_config() -> Result<AppConfig> {
    println!("Interactive Video Augmenter");
    println!("Press Enter to accept defaults or leave options unset.\n");

    let theme = ColorfulTheme::default();
    let input = loop {
        let raw: String = Input::with_theme(&theme)
            .with_prompt("Folder of source videos")
            .interact_text()?;
        let path = PathBuf::from(raw.trim());
        if path.is_dir() {
            break path;
        } else {
            println!("Folder not found, please try again.");
        }
    };

    let default_root = default_output_root(&input)?;
    let out_prompt = format!(
        "Output root [{}]",
        default_root.as_os_str().to_string_lossy()
    );
    let raw_root: String = Input::with_theme(&theme)
        .with_prompt(out_prompt)
        .allow_empty(true)
        .interact_text()?;
    let output_root = if raw_root.trim().is_empty() {
        default_root
    } else {
        PathBuf::from(raw_root.trim())
    };

    let (catalog_file, catalog) = loop {
        let Some(path) = prompt_optional_path(&theme, "Catalog file (blank = built-in filters)")?
        else {
            break (None, None);
        };
        match Catalog::from_toml_file(&path) {
            Ok(catalog) => break (Some(path), Some(catalog)),
            Err(err) => println!("{err}"),
        }
    };

    let tuning = if catalog.is_some() {
        FilterTuning::default()
    } else {
        FilterTuning {
            brightness_delta: prompt_validated(
                &theme,
                "Brightness delta (0.0-1.0)",
                filters::DEFAULT_BRIGHTNESS_DELTA,
                validate_brightness_delta,
            )?,
            noise_strength: prompt_validated(
                &theme,
                "Noise strength (1-100)",
                filters::DEFAULT_NOISE_STRENGTH,
                validate_noise_strength,
            )?,
            shift_px: prompt_validated(
                &theme,
                "Translation shift in pixels",
                filters::DEFAULT_SHIFT_PX,
                validate_positive_px,
            )?,
            block_px: prompt_validated(
                &theme,
                "Superpixel block size in pixels",
                filters::DEFAULT_BLOCK_PX,
                validate_positive_px,
            )?,
        }
    };
    let groups = catalog
        .unwrap_or_else(|| Catalog::builtin(tuning))
        .group_count();

    let stage_names = loop {
        let raw: String = Input::with_theme(&theme)
            .with_prompt("Stage folder names, comma separated (blank = numbered)")
            .allow_empty(true)
            .interact_text()?;
        match parse_stage_names(&raw, groups) {
            Ok(Some(names)) => break names,
            Ok(None) => {}
            Err(err) => {
                println!("{err}");
                continue;
            }
        }
        let count: u16 = Input::with_theme(&theme)
            .with_prompt(format!("Number of chained stages (1-{groups})"))
            .default(DEFAULT_STAGES.min(groups as u16))
            .interact_text()?;
        match numbered_stages(count, groups) {
            Ok(names) => break names,
            Err(err) => println!("{err}"),
        }
    };

    let extensions = loop {
        let raw: String = Input::with_theme(&theme)
            .with_prompt("Video extensions, comma separated")
            .default("mp4".to_string())
            .interact_text()?;
        let parsed = parse_extensions(&raw);
        if !parsed.is_empty() {
            break parsed;
        }
        println!("At least one extension is required.");
    };

    let probability = prompt_validated(
        &theme,
        "Augmentation probability (0.0-1.0)",
        DEFAULT_PROBABILITY,
        validate_probability,
    )?;

    let seed: Option<u64> = prompt_optional(&theme, "Random seed (blank = random)")?;
    let limit: Option<usize> = prompt_optional(&theme, "Stop after N augmented videos (blank = all)")?;

    let timeout_secs: u64 = Input::with_theme(&theme)
        .with_prompt("ffmpeg timeout in seconds (0 = none)")
        .default(DEFAULT_TIMEOUT_SECS)
        .interact_text()?;

    let verbose = Confirm::with_theme(&theme)
        .with_prompt("Show ffmpeg logs?")
        .default(false)
        .interact()?;

    let ffmpeg_path = prompt_optional_path(&theme, "Custom ffmpeg path (blank = PATH)")?;
    let ffprobe_path = prompt_optional_path(&theme, "Custom ffprobe path (blank = PATH)")?;

    let cfg = AppConfig {
        input,
        output_root,
        probability,
        stage_names,
        catalog_file,
        tuning,
        seed,
        limit,
        extensions,
        timeout: timeout_from_secs(timeout_secs),
        verbose,
        ffmpeg: ffmpeg_path,
        ffprobe: ffprobe_path,
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Blank input means "ask for a count instead".
fn parse_stage_names(raw: &str, groups: usize) -> Result<Option<Vec<String>>, String> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let names: Vec<String> = raw.split(',').map(|n| n.trim().to_string()).collect();
    validate_stage_names(&names).map_err(|e| e.to_string())?;
    if names.len() > groups {
        return Err(too_many_stages(names.len(), groups));
    }
    Ok(Some(names))
}

fn numbered_stages(count: u16, groups: usize) -> Result<Vec<String>, String> {
    if count == 0 {
        return Err("At least one stage is required.".to_string());
    }
    if usize::from(count) > groups {
        return Err(too_many_stages(count.into(), groups));
    }
    Ok(default_stage_names(count))
}

fn too_many_stages(requested: usize, groups: usize) -> String {
    format!("{requested} stages requested but only {groups} independent augmentations exist.")
}

fn parse_extensions(raw: &str) -> Vec<String> {
    let parts: Vec<String> = raw
        .split([',', ' '])
        .map(str::to_string)
        .collect();
    normalize_extensions(&parts)
}

fn prompt_validated<T: ToString>(
    theme: &ColorfulTheme,
    prompt: &str,
    default: T,
    validate: fn(&str) -> Result<T, String>,
) -> Result<T> {
    let default = default.to_string();
    loop {
        let raw: String = Input::with_theme(theme)
            .with_prompt(prompt)
            .default(default.clone())
            .interact_text()?;
        match validate(raw.trim()) {
            Ok(val) => return Ok(val),
            Err(err) => println!("Invalid value: {err}."),
        }
    }
}

fn prompt_optional<T: FromStr>(theme: &ColorfulTheme, prompt: &str) -> Result<Option<T>> {
    loop {
        let raw: String = Input::with_theme(theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match trimmed.parse() {
            Ok(val) => return Ok(Some(val)),
            Err(_) => println!("Invalid value `{trimmed}`. Enter a whole number or leave blank."),
        }
    }
}

fn prompt_optional_path(theme: &ColorfulTheme, prompt: &str) -> Result<Option<PathBuf>> {
    loop {
        let raw: String = Input::with_theme(theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let path = PathBuf::from(trimmed);
        if path.exists() {
            return Ok(Some(path));
        } else {
            println!("Path not found. Leave blank to skip or enter a valid file path.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_stage_names_fall_back_to_count() {
        assert_eq!(parse_stage_names("   ", 4), Ok(None));
    }

    #[test]
    fn test_stage_names_are_trimmed() {
        assert_eq!(
            parse_stage_names(" Light , Shift", 4),
            Ok(Some(vec!["Light".to_string(), "Shift".to_string()]))
        );
    }

    #[test]
    fn test_stage_names_beyond_groups_are_rejected() {
        let err = parse_stage_names("A,B,C", 2).unwrap_err();
        assert!(err.contains("only 2"), "{err}");
        assert!(parse_stage_names("A,,B", 4).is_err());
        assert!(parse_stage_names("A,A", 4).is_err());
    }

    #[test]
    fn test_numbered_stages_respect_group_count() {
        assert_eq!(
            numbered_stages(2, 4),
            Ok(vec!["Stage 1".to_string(), "Stage 2".to_string()])
        );
        assert!(numbered_stages(0, 4).is_err());
        let err = numbered_stages(5, 4).unwrap_err();
        assert!(err.contains("5 stages"), "{err}");
    }

    #[test]
    fn test_extensions_are_normalized() {
        assert_eq!(parse_extensions(".MP4, mov,,mp4"), vec!["mp4", "mov"]);
        assert!(parse_extensions(" , ").is_empty());
    }
}
