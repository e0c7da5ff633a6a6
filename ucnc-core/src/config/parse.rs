//! `machine.toml` reader
//!
//! A line-oriented reader for the subset of TOML the machine file uses:
//! `[section]` headers, `key = value` pairs with integer, float, boolean
//! and double-quoted string values, and `#` comments. Keys not set in the
//! file keep their `MotionSettings::default()` values.

use heapless::String;

use super::settings::{KinematicsConfig, MotionSettings};
use super::ConfigError;
use crate::planner::ProfileKind;

/// What went wrong on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseErrorKind {
    /// Line is neither a section header nor `key = value`
    Syntax,
    /// Section name not recognized
    UnknownSection,
    /// Key not valid in the current section
    UnknownKey,
    /// Value has the wrong type or does not parse
    InvalidValue,
}

/// Parse failure with its 1-based line number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParseError {
    pub line: u32,
    pub kind: ParseErrorKind,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Root,
    Kinematics,
    Planner,
    Interpolator,
    Skew,
    Overrides,
    Axis(usize),
}

#[derive(Clone, Copy)]
enum Value<'a> {
    Int(i64),
    Float(f32),
    Bool(bool),
    Str(&'a str),
}

impl Value<'_> {
    fn as_f32(self) -> Option<f32> {
        match self {
            Value::Int(v) => Some(v as f32),
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    fn as_u32(self) -> Option<u32> {
        match self {
            Value::Int(v) => u32::try_from(v).ok(),
            _ => None,
        }
    }

    fn as_u8(self) -> Option<u8> {
        self.as_u32().and_then(|v| u8::try_from(v).ok())
    }

    fn as_bool(self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Topology {
    Cartesian,
    CoreXY,
    LinearDelta,
    RotaryDelta,
}

/// Geometry keys may appear before or after `type`, so collect them first
#[derive(Default)]
struct Geometry {
    topology: Option<Topology>,
    arm_length: Option<f32>,
    base_radius: Option<f32>,
    effector_radius: Option<f32>,
    bicep_length: Option<f32>,
    forearm_length: Option<f32>,
}

/// Parse `machine.toml` into validated settings
pub fn parse_settings(source: &str) -> Result<MotionSettings, ConfigError> {
    let mut settings = MotionSettings::default();
    let mut geometry = Geometry::default();
    let mut section = Section::Root;

    for (index, raw) in source.lines().enumerate() {
        let line_no = index as u32 + 1;
        let err = |kind| ParseError {
            line: line_no,
            kind,
        };

        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix('[') {
            let name = name
                .strip_suffix(']')
                .ok_or(err(ParseErrorKind::Syntax))?
                .trim();
            section = section_from_name(name).ok_or(err(ParseErrorKind::UnknownSection))?;
            continue;
        }

        let (key, value) = line.split_once('=').ok_or(err(ParseErrorKind::Syntax))?;
        let key = key.trim();
        let value = parse_value(value.trim()).ok_or(err(ParseErrorKind::InvalidValue))?;

        apply(&mut settings, &mut geometry, section, key, value).map_err(err)?;
    }

    settings.kinematics = build_kinematics(&geometry, settings.kinematics)?;
    settings.validate()?;
    Ok(settings)
}

fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn section_from_name(name: &str) -> Option<Section> {
    match name {
        "kinematics" => Some(Section::Kinematics),
        "planner" => Some(Section::Planner),
        "interpolator" => Some(Section::Interpolator),
        "skew" => Some(Section::Skew),
        "overrides" => Some(Section::Overrides),
        "axis.x" => Some(Section::Axis(0)),
        "axis.y" => Some(Section::Axis(1)),
        "axis.z" => Some(Section::Axis(2)),
        "axis.a" => Some(Section::Axis(3)),
        _ => None,
    }
}

fn parse_value(text: &str) -> Option<Value<'_>> {
    if let Some(inner) = text.strip_prefix('"') {
        return inner.strip_suffix('"').map(Value::Str);
    }
    match text {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        _ => {}
    }

    // TOML allows underscores between digits
    let mut digits: String<32> = String::new();
    for c in text.chars().filter(|c| *c != '_') {
        digits.push(c).ok()?;
    }

    if let Ok(v) = digits.parse::<i64>() {
        return Some(Value::Int(v));
    }
    digits
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Value::Float)
}

fn apply(
    settings: &mut MotionSettings,
    geometry: &mut Geometry,
    section: Section,
    key: &str,
    value: Value<'_>,
) -> Result<(), ParseErrorKind> {
    use ParseErrorKind::{InvalidValue, UnknownKey};

    match section {
        Section::Root => return Err(UnknownKey),
        Section::Kinematics => match key {
            "type" => {
                let Value::Str(name) = value else {
                    return Err(InvalidValue);
                };
                geometry.topology = Some(match name {
                    "cartesian" => Topology::Cartesian,
                    "corexy" => Topology::CoreXY,
                    "linear_delta" => Topology::LinearDelta,
                    "rotary_delta" => Topology::RotaryDelta,
                    _ => return Err(InvalidValue),
                });
            }
            "arm_length" => geometry.arm_length = Some(float(value)?),
            "base_radius" => geometry.base_radius = Some(float(value)?),
            "effector_radius" => geometry.effector_radius = Some(float(value)?),
            "bicep_length" => geometry.bicep_length = Some(float(value)?),
            "forearm_length" => geometry.forearm_length = Some(float(value)?),
            _ => return Err(UnknownKey),
        },
        Section::Planner => match key {
            "junction_deviation" => settings.junction_deviation = float(value)?,
            "soft_limits" => settings.soft_limits = value.as_bool().ok_or(InvalidValue)?,
            "profile" => {
                settings.profile = match value {
                    Value::Str("trapezoidal") => ProfileKind::Trapezoidal,
                    Value::Str("s_curve") => ProfileKind::SCurve,
                    _ => return Err(InvalidValue),
                }
            }
            _ => return Err(UnknownKey),
        },
        Section::Interpolator => match key {
            "timer_hz" => settings.timer_hz = value.as_u32().ok_or(InvalidValue)?,
            "idle_rate_hz" => settings.idle_rate_hz = value.as_u32().ok_or(InvalidValue)?,
            "dss_max_oversampling" => {
                settings.dss.max_oversampling = value.as_u8().ok_or(InvalidValue)?
            }
            "dss_cutoff_hz" => settings.dss.cutoff_hz = value.as_u32().ok_or(InvalidValue)?,
            _ => return Err(UnknownKey),
        },
        Section::Skew => match key {
            "xy" => settings.skew.xy = float(value)?,
            "xz" => settings.skew.xz = float(value)?,
            "yz" => settings.skew.yz = float(value)?,
            "xy_only" => settings.skew.xy_only = value.as_bool().ok_or(InvalidValue)?,
            _ => return Err(UnknownKey),
        },
        Section::Overrides => {
            let v = value.as_u8().ok_or(InvalidValue)?;
            match key {
                "min" => settings.overrides.min = v,
                "max" => settings.overrides.max = v,
                "coarse" => settings.overrides.coarse = v,
                "fine" => settings.overrides.fine = v,
                _ => return Err(UnknownKey),
            }
        }
        Section::Axis(i) => {
            let axis = &mut settings.axes[i];
            match key {
                "steps_per_unit" => axis.steps_per_unit = float(value)?,
                "max_feed" => axis.max_feed = float(value)?,
                "max_accel" => axis.max_accel = float(value)?,
                "max_travel" => axis.max_travel = float(value)?,
                "backlash_steps" => {
                    axis.backlash_steps = value
                        .as_u32()
                        .and_then(|v| u16::try_from(v).ok())
                        .ok_or(InvalidValue)?
                }
                _ => return Err(UnknownKey),
            }
        }
    }
    Ok(())
}

fn float(value: Value<'_>) -> Result<f32, ParseErrorKind> {
    value.as_f32().ok_or(ParseErrorKind::InvalidValue)
}

fn build_kinematics(
    geometry: &Geometry,
    current: KinematicsConfig,
) -> Result<KinematicsConfig, ConfigError> {
    let Some(topology) = geometry.topology else {
        return Ok(current);
    };
    let need = |v: Option<f32>| v.ok_or(ConfigError::InvalidGeometry);

    Ok(match topology {
        Topology::Cartesian => KinematicsConfig::Cartesian,
        Topology::CoreXY => KinematicsConfig::CoreXY,
        Topology::LinearDelta => KinematicsConfig::LinearDelta {
            arm_length: need(geometry.arm_length)?,
            base_radius: need(geometry.base_radius)?,
            effector_radius: geometry.effector_radius.unwrap_or(0.0),
        },
        Topology::RotaryDelta => KinematicsConfig::RotaryDelta {
            bicep_length: need(geometry.bicep_length)?,
            forearm_length: need(geometry.forearm_length)?,
            base_radius: need(geometry.base_radius)?,
            effector_radius: geometry.effector_radius.unwrap_or(0.0),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MACHINE: &str = r#"
# Kossel-style printer
[kinematics]
type = "linear_delta"   # three towers
arm_length = 250.0
base_radius = 124
effector_radius = 24.0

[planner]
junction_deviation = 0.02
profile = "s_curve"
soft_limits = true

[interpolator]
timer_hz = 1_000_000
dss_max_oversampling = 2
dss_cutoff_hz = 800

[axis.x]
steps_per_unit = 100
max_feed = 12000
max_accel = 3000.5
backlash_steps = 4
"#;

    #[test]
    fn test_parse_machine_file() {
        let settings = parse_settings(MACHINE).unwrap();
        assert_eq!(
            settings.kinematics,
            KinematicsConfig::LinearDelta {
                arm_length: 250.0,
                base_radius: 124.0,
                effector_radius: 24.0,
            }
        );
        assert_eq!(settings.junction_deviation, 0.02);
        assert_eq!(settings.profile, ProfileKind::SCurve);
        assert!(settings.soft_limits);
        assert_eq!(settings.timer_hz, 1_000_000);
        assert_eq!(settings.dss.max_oversampling, 2);
        assert_eq!(settings.dss.cutoff_hz, 800);
        assert_eq!(settings.axes[0].steps_per_unit, 100.0);
        assert_eq!(settings.axes[0].max_accel, 3000.5);
        assert_eq!(settings.axes[0].backlash_steps, 4);
        // untouched axis keeps defaults
        assert_eq!(settings.axes[1], MotionSettings::default().axes[1]);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse_settings(""), Ok(MotionSettings::default()));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let src = "[planner]\njunction_deviation = 0.01\nbogus = 1\n";
        assert_eq!(
            parse_settings(src),
            Err(ConfigError::Parse(ParseError {
                line: 3,
                kind: ParseErrorKind::UnknownKey,
            }))
        );

        let src = "[axis.w]\n";
        assert_eq!(
            parse_settings(src),
            Err(ConfigError::Parse(ParseError {
                line: 1,
                kind: ParseErrorKind::UnknownSection,
            }))
        );

        let src = "[skew]\nxy_only = 3\n";
        assert_eq!(
            parse_settings(src),
            Err(ConfigError::Parse(ParseError {
                line: 2,
                kind: ParseErrorKind::InvalidValue,
            }))
        );

        let src = "[skew]\nxy 0.1\n";
        assert_eq!(
            parse_settings(src),
            Err(ConfigError::Parse(ParseError {
                line: 2,
                kind: ParseErrorKind::Syntax,
            }))
        );
    }

    #[test]
    fn test_missing_delta_geometry() {
        let src = "[kinematics]\ntype = \"rotary_delta\"\nbicep_length = 100\n";
        assert_eq!(parse_settings(src), Err(ConfigError::InvalidGeometry));
    }

    #[test]
    fn test_parsed_values_are_validated() {
        let src = "[axis.z]\nmax_feed = -5\n";
        assert_eq!(parse_settings(src), Err(ConfigError::InvalidAxis));
    }

    #[test]
    fn test_hash_inside_string() {
        assert_eq!(strip_comment(r#"a = "x#y" # c"#), r#"a = "x#y" "#);
    }
}
