//! Configuration loading
//!
//! The configuration is a TOML file; every field has a default, so a
//! missing file or a partial one is fine.

mod schema;

pub use schema::*;

use std::path::Path;

use tracing::{debug, info};

use crate::error::{AppError, Result};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "HIDTRACK_CONFIG";

/// Parse a configuration from TOML text
pub fn parse(text: &str) -> Result<AppConfig> {
    toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))
}

/// Load the configuration file, or defaults when `path` is `None`
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        debug!("No configuration file, using defaults");
        return Ok(AppConfig::default());
    };

    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let config = parse(&text)?;
    validate(&config)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Reject settings the bridge cannot run with
pub fn validate(config: &AppConfig) -> Result<()> {
    if config.poll_interval_ms == 0 {
        return Err(AppError::Config("poll_interval_ms must be positive".to_string()));
    }
    for spec in config.axes.specs() {
        if spec.minimum > spec.maximum {
            return Err(AppError::Config(format!(
                "Axis {:?} range is inverted: {} > {}",
                spec.axis, spec.minimum, spec.maximum
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Axis, ControlProfile};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.profile, ControlProfile::Joystick);
        assert_eq!(config.device.vendor_id, 2);
        assert_eq!(config.device.product_id, 3);
        assert_eq!(config.axes.rz, AxisRange::new(-130, 130));
    }

    #[test]
    fn test_partial_file() {
        let config = parse(
            r#"
            profile = "vr"
            poll_interval_ms = 50

            [device]
            serial_number = "SN 42"

            [axes.z]
            min = -100
            max = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.profile, ControlProfile::Vr);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.device.serial_number, "SN 42");
        assert_eq!(config.device.name, "LinuxTrack Virtual Control");
        assert_eq!(config.axes.z, AxisRange::new(-100, 100));
        assert_eq!(config.axes.x, AxisRange::new(-300, 300));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "descriptor_capacity = 64").unwrap();
        writeln!(file, "[tracker]").unwrap();
        writeln!(file, "bind_address = \"0.0.0.0:5555\"").unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.descriptor_capacity, 64);
        assert_eq!(config.tracker.bind_address, "0.0.0.0:5555");
        assert_eq!(config.tracker.init_timeout_ms, 20_000);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(parse("profile = \"wheel\""), Err(AppError::Config(_))));

        let mut config = AppConfig::default();
        config.axes.ry = AxisRange::new(10, -10);
        assert!(validate(&config).is_err());

        let missing = Path::new("/nonexistent/hidtrack.toml");
        assert!(load(Some(missing)).is_err());
    }

    #[test]
    fn test_specs_in_report_order() {
        let specs = AxisLimits::default().specs();
        let axes: Vec<Axis> = specs.iter().map(|s| s.axis).collect();
        assert_eq!(axes, Axis::ALL.to_vec());
        assert_eq!(specs[2].minimum, 0);
        assert_eq!(specs[2].maximum, 300);
    }

    #[test]
    fn test_axis_range_clamp() {
        let range = AxisRange::new(-45, 45);
        assert_eq!(range.clamp(12.9), 12);
        assert_eq!(range.clamp(-12.9), -12);
        assert_eq!(range.clamp(100.0), 45);
        assert_eq!(range.clamp(-100.0), -45);
        assert_eq!(range.clamp(f32::NAN), 0);
        assert_eq!(AxisRange::new(10, 20).clamp(f32::NAN), 10);
    }
}
