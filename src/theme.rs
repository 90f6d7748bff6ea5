//! File-backed loader for the optional color scheme (spec §6 "Optional
//! color scheme"). Mirrors the `from_str`/`from_file` split already used
//! by [`crate::osk::OskModel::add_custom_set`]: the pure parser lives on
//! [`crate::color::ColorPalette`] itself, this is just the I/O wrapper.

use crate::color::ColorPalette;
use crate::error::{CoreError, Result};

/// Reads `path` and applies its `name=#RRGGBB` overrides to `palette`.
/// Malformed lines inside the file are skipped at the parser level (spec
/// §7); only the file read itself can fail here.
pub fn load_theme_file(palette: &mut ColorPalette, path: &str) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CoreError::MalformedInput(format!("reading color scheme {:?}: {}", path, e)))?;
    palette.load_theme_str(&contents);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_surfaces_as_malformed_input() {
        let mut palette = ColorPalette::default();
        let err = load_theme_file(&mut palette, "/nonexistent/path/to/theme.txt").unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput(_)));
    }
}
