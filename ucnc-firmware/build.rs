//! Build script for ucnc-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates machine.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// embassy-time tick rate the firmware is built with
const TICK_HZ: i64 = 1_000_000;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate machine.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=machine.toml");

    let config_path = Path::new("machine.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: machine.toml not found!                                  ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a machine.toml configuration file.        ║\n\
            ║  Please create one in the ucnc-firmware directory.               ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read machine.toml                              ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in machine.toml                      ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_kinematics(&config, &mut errors);
    validate_planner(&config, &mut errors);
    validate_interpolator(&config, &mut errors);
    validate_axes(&config, &mut errors);
    report("Invalid machine configuration", &errors);

    println!("cargo:warning=machine.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn number(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Integer(v) => Some(*v as f64),
        toml::Value::Float(v) => Some(*v),
        _ => None,
    }
}

fn require_positive(table: &toml::Table, section: &str, key: &str, errors: &mut Vec<String>) {
    match table.get(key).map(number) {
        None => errors.push(format!("[{}] missing '{}'", section, key)),
        Some(Some(v)) if v > 0.0 => {}
        Some(_) => errors.push(format!("[{}] '{}' must be a positive number", section, key)),
    }
}

fn validate_kinematics(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(kinematics) = config.get("kinematics").and_then(|k| k.as_table()) else {
        errors.push("Missing [kinematics] section".to_string());
        return;
    };

    match kinematics.get("type").and_then(|t| t.as_str()) {
        Some("cartesian") | Some("corexy") => {}
        Some("linear_delta") => {
            require_positive(kinematics, "kinematics", "arm_length", errors);
            require_positive(kinematics, "kinematics", "base_radius", errors);
        }
        Some("rotary_delta") => {
            require_positive(kinematics, "kinematics", "bicep_length", errors);
            require_positive(kinematics, "kinematics", "forearm_length", errors);
            require_positive(kinematics, "kinematics", "base_radius", errors);
        }
        Some(other) => errors.push(format!("[kinematics] unknown type '{}'", other)),
        None => errors.push("[kinematics] missing 'type'".to_string()),
    }
}

fn validate_planner(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(planner) = config.get("planner").and_then(|p| p.as_table()) else {
        return;
    };

    if planner.contains_key("junction_deviation") {
        require_positive(planner, "planner", "junction_deviation", errors);
    }
    if let Some(profile) = planner.get("profile") {
        if !matches!(profile.as_str(), Some("trapezoidal") | Some("s_curve")) {
            errors.push("[planner] profile must be 'trapezoidal' or 's_curve'".to_string());
        }
    }
}

fn validate_interpolator(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(interpolator) = config.get("interpolator").and_then(|i| i.as_table()) else {
        return;
    };

    if let Some(hz) = interpolator.get("timer_hz") {
        if hz.as_integer() != Some(TICK_HZ) {
            errors.push(format!("[interpolator] timer_hz must be {}", TICK_HZ));
        }
    }
    if let Some(level) = interpolator.get("dss_max_oversampling") {
        if !matches!(level.as_integer(), Some(0..=3)) {
            errors.push("[interpolator] dss_max_oversampling must be 0-3".to_string());
        }
    }
    if let Some(toml::Value::Integer(rate)) = interpolator.get("idle_rate_hz") {
        if *rate <= 0 || *rate > TICK_HZ {
            errors.push("[interpolator] idle_rate_hz out of range".to_string());
        }
    }
}

fn validate_axes(config: &toml::Value, errors: &mut Vec<String>) {
    let axes = match config.get("axis") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("[axis] must contain [axis.<name>] tables".to_string());
            return;
        }
        None => return,
    };

    for (name, axis) in axes {
        if !["x", "y", "z", "a"].contains(&name.as_str()) {
            errors.push(format!("[axis.{}] unknown axis, use x, y, z or a", name));
            continue;
        }
        let Some(axis) = axis.as_table() else {
            errors.push(format!("[axis.{}] must be a table", name));
            continue;
        };

        let section = format!("axis.{}", name);
        for key in ["steps_per_unit", "max_feed", "max_accel"] {
            if axis.contains_key(key) {
                require_positive(axis, &section, key, errors);
            }
        }
        if let Some(toml::Value::Integer(backlash)) = axis.get("backlash_steps") {
            if *backlash < 0 || *backlash > u16::MAX as i64 {
                errors.push(format!("[axis.{}] backlash_steps out of range", name));
            }
        }
    }
}
