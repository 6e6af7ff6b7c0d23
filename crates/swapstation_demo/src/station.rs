// SPDX-License-Identifier: MIT OR Apache-2.0
//! The battery-swap station scene and its animation scenarios.
//!
//! Only the animated objects are modelled. Positions are in scene units,
//! rotations in radians.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use swapstation_sequencer::{Channel, SceneGraph, SequenceDefinition, Step, Transform, Tween};

/// Robot arm mounted next to the cabinet
pub const ROBOT_ARM: &str = "robot_arm";
/// Charged battery handed out by the station
pub const BATTERY: &str = "battery";
/// Delivery rider
pub const RIDER: &str = "rider";
/// Rider's electric bike
pub const ELECTRIC_BIKE: &str = "electric_bike";
/// Depleted battery in the bike
pub const OLD_BATTERY: &str = "old_battery";

/// Stages of the station demo, in order
pub const STATION_DEMO_STAGES: [&str; 4] = [
    "arm_swing",
    "battery_pickup",
    "battery_transport",
    "battery_install",
];

/// Name of the rider-swap sequence
pub const RIDER_SWAP: &str = "rider_swap";

/// Transform every animated object starts from
pub fn initial_transform(handle: &str) -> Transform {
    match handle {
        ROBOT_ARM => Transform::at([-2.0, 0.0, 0.0]),
        BATTERY => Transform::at([3.0, 0.2, 0.0]),
        RIDER => Transform::at([5.0, 0.0, 2.0]),
        ELECTRIC_BIKE => Transform::at([4.0, 0.0, 2.0]),
        OLD_BATTERY => Transform::at([4.0, 0.6, 2.0]),
        _ => Transform::default(),
    }
}

/// Build the station scene with every object at its initial transform
pub fn station_scene() -> SceneGraph {
    [ROBOT_ARM, BATTERY, RIDER, ELECTRIC_BIKE, OLD_BATTERY]
        .into_iter()
        .fold(SceneGraph::new(), |scene, handle| {
            scene.with_object(handle, initial_transform(handle))
        })
}

/// The four chained station-demo sequences
pub fn station_demo_sequences() -> Vec<SequenceDefinition> {
    let arm_swing = SequenceDefinition::new(STATION_DEMO_STAGES[0])
        .with_step(Step::new("swing arm to the rack", 2000.0).with_tween(Tween::by(ROBOT_ARM, Channel::RotationY, FRAC_PI_2)))
        .with_initial(ROBOT_ARM, initial_transform(ROBOT_ARM));

    let battery_pickup = SequenceDefinition::new(STATION_DEMO_STAGES[1])
        .with_step(
            Step::new("lift battery", 1500.0)
                .with_tween(Tween::to(BATTERY, Channel::PositionY, 1.7))
                .with_tween(Tween::between(BATTERY, Channel::PositionX, 3.0, 1.0)),
        )
        .with_initial(BATTERY, initial_transform(BATTERY));

    let battery_transport = SequenceDefinition::new(STATION_DEMO_STAGES[2])
        .with_step(
            Step::new("carry battery to the cabinet", 2000.0)
                .with_tween(Tween::between(ROBOT_ARM, Channel::RotationY, FRAC_PI_2, 0.0))
                .with_tween(Tween::between(BATTERY, Channel::PositionX, 1.0, 0.0)),
        )
        .with_initial(ROBOT_ARM, initial_transform(ROBOT_ARM))
        .with_initial(BATTERY, initial_transform(BATTERY));

    let battery_install = SequenceDefinition::new(STATION_DEMO_STAGES[3])
        .with_step(
            Step::new("slot battery in", 1500.0)
                .with_tween(Tween::to(BATTERY, Channel::PositionY, 2.2))
                .with_tween(Tween::between(BATTERY, Channel::PositionZ, 0.0, 0.8)),
        )
        .with_initial(BATTERY, initial_transform(BATTERY));

    vec![arm_swing, battery_pickup, battery_transport, battery_install]
}

/// The seven-step rider swap, with `gap_ms` between steps
pub fn rider_swap_sequence(gap_ms: f64) -> SequenceDefinition {
    const STEP_MS: f64 = 2000.0;

    let steps = [
        Step::new("rider walks to the cabinet", STEP_MS)
            .with_tween(Tween::between(RIDER, Channel::PositionX, 5.0, 2.0))
            .with_tween(Tween::between(RIDER, Channel::RotationY, 0.0, -FRAC_PI_4)),
        Step::new("rider pulls the old battery", STEP_MS)
            .with_tween(Tween::between(OLD_BATTERY, Channel::PositionY, 0.6, 0.9))
            .with_tween(Tween::between(OLD_BATTERY, Channel::PositionX, 4.0, 2.5)),
        Step::new("arm readies the new battery", STEP_MS)
            .with_tween(Tween::between(ROBOT_ARM, Channel::RotationY, 0.0, FRAC_PI_2))
            .with_tween(Tween::between(BATTERY, Channel::PositionX, 3.0, 2.0))
            .with_tween(Tween::between(BATTERY, Channel::PositionY, 0.2, 0.7)),
        Step::new("rider stows the old battery", STEP_MS)
            .with_tween(Tween::between(OLD_BATTERY, Channel::PositionX, 2.5, 0.0))
            .with_tween(Tween::between(OLD_BATTERY, Channel::PositionY, 0.9, 0.8))
            .hide_on_complete(OLD_BATTERY),
        Step::new("rider takes the new battery", STEP_MS)
            .with_tween(Tween::between(BATTERY, Channel::PositionX, 2.0, 3.5))
            .with_tween(Tween::between(BATTERY, Channel::PositionY, 0.7, 0.9)),
        Step::new("rider installs it in the bike", STEP_MS)
            .with_tween(Tween::between(BATTERY, Channel::PositionX, 3.5, 4.0))
            .with_tween(Tween::between(BATTERY, Channel::PositionY, 0.9, 0.6)),
        Step::new("rider returns to the bike", STEP_MS)
            .with_tween(Tween::between(RIDER, Channel::PositionX, 2.0, 4.5))
            .with_tween(Tween::between(RIDER, Channel::RotationY, -FRAC_PI_4, 0.0)),
    ];

    [RIDER, ELECTRIC_BIKE, OLD_BATTERY, BATTERY, ROBOT_ARM]
        .into_iter()
        .fold(
            SequenceDefinition::new(RIDER_SWAP)
                .with_steps(steps)
                .with_step_gap(gap_ms),
            |def, handle| def.with_initial(handle, initial_transform(handle)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use swapstation_sequencer::{AnimationSequencer, SceneObjectRegistry};

    #[test]
    fn test_scene_has_every_handle() {
        let scene = station_scene();
        assert_eq!(scene.len(), 5);
        assert_eq!(scene.transform(OLD_BATTERY), Some(&Transform::at([4.0, 0.6, 2.0])));
        assert!(scene.transform(OLD_BATTERY).unwrap().visible);
    }

    #[test]
    fn test_sequences_define_against_scene() {
        let mut seq = AnimationSequencer::new(station_scene());
        for def in station_demo_sequences() {
            seq.define(def).unwrap();
        }
        seq.define(rider_swap_sequence(500.0)).unwrap();

        let names: Vec<_> = seq.sequence_names().collect();
        assert_eq!(names[..4], STATION_DEMO_STAGES);
        assert_eq!(names[4], RIDER_SWAP);
    }

    #[test]
    fn test_station_demo_durations() {
        let total: f64 = station_demo_sequences()
            .iter()
            .map(SequenceDefinition::total_duration_ms)
            .sum();
        assert_eq!(total, 7000.0);
    }

    #[test]
    fn test_rider_swap_shape() {
        let def = rider_swap_sequence(500.0);
        assert_eq!(def.step_count(), 7);
        assert_eq!(def.total_duration_ms(), 14_000.0);
        assert_eq!(def.step_gap_ms, Some(500.0));
        assert_eq!(def.initial_transforms().count(), 5);
        assert_eq!(def.steps()[3].on_complete.len(), 1);
    }
}
