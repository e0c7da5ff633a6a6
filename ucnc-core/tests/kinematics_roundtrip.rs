//! forward(inverse(P)) == P within half a step for every topology

use proptest::prelude::*;
use ucnc_core::config::{KinematicsConfig, MotionSettings, SkewFactors};
use ucnc_core::kinematics::Transform;

fn settings(kinematics: KinematicsConfig, steps_per_unit: f32) -> MotionSettings {
    let mut settings = MotionSettings::default();
    settings.kinematics = kinematics;
    for axis in settings.axes.iter_mut().take(3) {
        axis.steps_per_unit = steps_per_unit;
    }
    settings
}

fn check(transform: &Transform, p: [f32; 4], eps: f32) -> Result<(), TestCaseError> {
    let steps = transform.inverse(&p).map_err(|e| TestCaseError::fail(format!("{:?}", e)))?;
    let back = transform.forward(&steps);
    for i in 0..4 {
        prop_assert!(
            (back[i] - p[i]).abs() <= eps,
            "axis {} of {:?}: got {:?}",
            i,
            p,
            back
        );
    }
    Ok(())
}

proptest! {
    #[test]
    fn cartesian_round_trip(
        x in -200.0f32..200.0,
        y in -200.0f32..200.0,
        z in -100.0f32..100.0,
        a in -360.0f32..360.0,
    ) {
        let transform = Transform::new(&settings(KinematicsConfig::Cartesian, 80.0));
        check(&transform, [x, y, z, a], 0.051)?;
    }

    #[test]
    fn corexy_round_trip(
        x in -200.0f32..200.0,
        y in -200.0f32..200.0,
        z in -100.0f32..100.0,
    ) {
        let transform = Transform::new(&settings(KinematicsConfig::CoreXY, 80.0));
        check(&transform, [x, y, z, 0.0], 1.0 / 80.0)?;
    }

    #[test]
    fn skewed_cartesian_round_trip(
        x in -150.0f32..150.0,
        y in -150.0f32..150.0,
        z in 0.0f32..100.0,
    ) {
        let mut s = settings(KinematicsConfig::Cartesian, 80.0);
        s.skew = SkewFactors { xy: 0.003, xz: -0.002, yz: 0.001, xy_only: false };
        check(&Transform::new(&s), [x, y, z, 0.0], 1.0 / 80.0)?;
    }

    #[test]
    fn linear_delta_round_trip(
        x in -60.0f32..60.0,
        y in -60.0f32..60.0,
        z in 0.0f32..150.0,
    ) {
        let transform = Transform::new(&settings(
            KinematicsConfig::LinearDelta {
                arm_length: 250.0,
                base_radius: 124.0,
                effector_radius: 24.0,
            },
            100.0,
        ));
        check(&transform, [x, y, z, 0.0], 0.05)?;
    }

    #[test]
    fn rotary_delta_round_trip(
        x in -40.0f32..40.0,
        y in -40.0f32..40.0,
        z in -300.0f32..-230.0,
    ) {
        let transform = Transform::new(&settings(
            KinematicsConfig::RotaryDelta {
                bicep_length: 100.0,
                forearm_length: 250.0,
                base_radius: 100.0,
                effector_radius: 30.0,
            },
            100.0,
        ));
        check(&transform, [x, y, z, 0.0], 0.1)?;
    }
}
