pub const DEFAULT_BRIGHTNESS_DELTA: f64 = 0.3;
pub const DEFAULT_NOISE_STRENGTH: u8 = 50;
pub const DEFAULT_SHIFT_PX: u32 = 5;
pub const DEFAULT_BLOCK_PX: u32 = 16;

pub fn validate_probability(raw: &str) -> Result<f64, String> {
    let parsed: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` must be a number between 0.0 and 1.0"))?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err("probability must be between 0.0 and 1.0".into());
    }
    Ok(parsed)
}

pub fn validate_brightness_delta(raw: &str) -> Result<f64, String> {
    let parsed: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` must be a number between 0.0 and 1.0"))?;
    if parsed <= 0.0 || parsed > 1.0 {
        return Err("brightness delta must be in (0.0, 1.0]".into());
    }
    Ok(parsed)
}

pub fn validate_noise_strength(raw: &str) -> Result<u8, String> {
    let parsed: u8 = raw
        .parse()
        .map_err(|_| format!("`{raw}` must be an integer between 1 and 100"))?;
    if parsed == 0 || parsed > 100 {
        return Err("noise strength must be between 1 and 100".into());
    }
    Ok(parsed)
}

pub fn validate_positive_px(raw: &str) -> Result<u32, String> {
    let parsed: u32 = raw
        .parse()
        .map_err(|_| format!("`{raw}` must be a positive integer"))?;
    if parsed == 0 {
        return Err("pixel amount must be > 0".into());
    }
    Ok(parsed)
}

/// `eq` brightness offset; positive brightens, negative darkens.
pub fn brightness_filter(delta: f64) -> String {
    format!("eq=brightness={delta}")
}

/// Temporal uniform luma noise.
pub fn noise_filter(strength: u8) -> String {
    format!("noise=c0s={strength}:c0f=t+u")
}

/// Shifts the frame down/right by padding the top-left corner with black.
pub fn translation_filter(shift_px: u32) -> String {
    format!("setpts=PTS-STARTPTS,pad=iw+{shift_px}:ih+{shift_px}:{shift_px}:{shift_px}:black")
}

pub fn superpixel_filter(block_px: u32) -> String {
    format!("pixelize=width={block_px}:height={block_px}")
}
