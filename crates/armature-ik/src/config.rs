//! Solver configuration, loadable from TOML.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_iterations() -> u32 {
    10
}
const fn default_tolerance() -> f32 {
    0.01
}
const fn default_damping_factor() -> f32 {
    0.7
}
const fn default_angle_limit() -> f32 {
    0.3
}
const fn default_orientation_weight() -> f32 {
    0.1
}
const fn default_orientation_scale() -> f32 {
    0.1
}
const fn default_orientation_threshold() -> f32 {
    0.01
}
const fn default_position_weight_coarse() -> f32 {
    0.8
}
const fn default_position_weight_fine() -> f32 {
    0.3
}
const fn default_coarse_distance() -> f32 {
    0.1
}

// ---------------------------------------------------------------------------
// CcdConfig
// ---------------------------------------------------------------------------

/// Tuning parameters for the CCD solver.
///
/// The blend constants (`orientation_scale`, the coarse/fine position
/// weights, `orientation_threshold`) are empirically chosen; treat them as
/// starting points rather than derived quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcdConfig {
    /// Maximum solver iterations per call (default: 10).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Position convergence tolerance in meters (default: 0.01).
    /// Orientation converges at `2 * tolerance` radians.
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// Scale applied to every computed joint delta (default: 0.7).
    /// Lower is more stable, higher converges faster.
    #[serde(default = "default_damping_factor")]
    pub damping_factor: f32,

    /// Per-step joint delta cap in radians, applied after damping
    /// (default: 0.3).
    #[serde(default = "default_angle_limit")]
    pub angle_limit: f32,

    /// Overall strength of the orientation correction term (default: 0.1).
    /// Zero disables orientation correction entirely.
    #[serde(default = "default_orientation_weight")]
    pub orientation_weight: f32,

    /// Extra scale on the orientation term (default: 0.1).
    #[serde(default = "default_orientation_scale")]
    pub orientation_scale: f32,

    /// Orientation error below which no orientation correction is applied,
    /// in radians (default: 0.01).
    #[serde(default = "default_orientation_threshold")]
    pub orientation_threshold: f32,

    /// Position-term blend weight while the effector is far from the target
    /// (default: 0.8).
    #[serde(default = "default_position_weight_coarse")]
    pub position_weight_coarse: f32,

    /// Position-term blend weight once the effector is close, letting the
    /// orientation term dominate (default: 0.3).
    #[serde(default = "default_position_weight_fine")]
    pub position_weight_fine: f32,

    /// Position error, in meters, separating the coarse and fine blend
    /// regimes (default: 0.1).
    #[serde(default = "default_coarse_distance")]
    pub coarse_distance: f32,
}

impl Default for CcdConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            damping_factor: default_damping_factor(),
            angle_limit: default_angle_limit(),
            orientation_weight: default_orientation_weight(),
            orientation_scale: default_orientation_scale(),
            orientation_threshold: default_orientation_threshold(),
            position_weight_coarse: default_position_weight_coarse(),
            position_weight_fine: default_position_weight_fine(),
            coarse_distance: default_coarse_distance(),
        }
    }
}

impl CcdConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        for (field, value) in [
            ("tolerance", self.tolerance),
            ("angle_limit", self.angle_limit),
            ("coarse_distance", self.coarse_distance),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if self.damping_factor <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "damping_factor",
                value: self.damping_factor,
            });
        }
        for (field, value) in [
            ("damping_factor", self.damping_factor),
            ("position_weight_coarse", self.position_weight_coarse),
            ("position_weight_fine", self.position_weight_fine),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }
        for (field, value) in [
            ("orientation_weight", self.orientation_weight),
            ("orientation_scale", self.orientation_scale),
            ("orientation_threshold", self.orientation_threshold),
        ] {
            if value < 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = CcdConfig::default();
        assert_eq!(cfg.max_iterations, 10);
        assert!((cfg.tolerance - 0.01).abs() < f32::EPSILON);
        assert!((cfg.damping_factor - 0.7).abs() < f32::EPSILON);
        assert!((cfg.angle_limit - 0.3).abs() < f32::EPSILON);
        assert!((cfg.orientation_weight - 0.1).abs() < f32::EPSILON);
        assert!((cfg.orientation_scale - 0.1).abs() < f32::EPSILON);
        assert!((cfg.orientation_threshold - 0.01).abs() < f32::EPSILON);
        assert!((cfg.position_weight_coarse - 0.8).abs() < f32::EPSILON);
        assert!((cfg.position_weight_fine - 0.3).abs() < f32::EPSILON);
        assert!((cfg.coarse_distance - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn validate_default_ok() {
        assert!(CcdConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_iterations() {
        let cfg = CcdConfig {
            max_iterations: 0,
            ..CcdConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroIterations)
        ));
    }

    #[test]
    fn validate_negative_tolerance() {
        let cfg = CcdConfig {
            tolerance: -0.01,
            ..CcdConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositive { field: "tolerance", .. })
        ));
    }

    #[test]
    fn validate_zero_damping() {
        let cfg = CcdConfig {
            damping_factor: 0.0,
            ..CcdConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositive { field: "damping_factor", .. })
        ));
    }

    #[test]
    fn validate_damping_above_one() {
        let cfg = CcdConfig {
            damping_factor: 1.5,
            ..CcdConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfUnitRange { field: "damping_factor", .. })
        ));
    }

    #[test]
    fn validate_zero_orientation_weight_ok() {
        // Zero is a valid way to disable orientation correction.
        let cfg = CcdConfig {
            orientation_weight: 0.0,
            ..CcdConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn toml_partial_overrides() {
        let toml_str = r"
            max_iterations = 50
            tolerance = 0.001
        ";
        let cfg: CcdConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.max_iterations, 50);
        assert!((cfg.tolerance - 0.001).abs() < f32::EPSILON);
        // Untouched fields keep defaults.
        assert!((cfg.damping_factor - 0.7).abs() < f32::EPSILON);
        assert!((cfg.angle_limit - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn toml_empty_gives_defaults() {
        let cfg: CcdConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, CcdConfig::default());
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = std::env::temp_dir().join("armature_test_ccd_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("solver.toml");
        std::fs::write(
            &path,
            r"
            max_iterations = 25
            damping_factor = 0.5
        ",
        )
        .unwrap();

        let cfg = CcdConfig::from_file(&path).unwrap();
        assert_eq!(cfg.max_iterations, 25);
        assert!((cfg.damping_factor - 0.5).abs() < f32::EPSILON);

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn from_file_rejects_invalid() {
        let dir = std::env::temp_dir().join("armature_test_ccd_config_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "max_iterations = 0").unwrap();

        assert!(CcdConfig::from_file(&path).is_err());

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn from_file_not_found() {
        assert!(CcdConfig::from_file("/nonexistent/solver.toml").is_err());
    }
}
