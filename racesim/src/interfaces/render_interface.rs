use crate::core::car::{Car, Kinematic};
use crate::core::race::RacePhase;
use crate::post::race_result::RaceStandings;

pub const MAX_RENDER_UPDATE_FREQUENCY: f64 = 30.0;

/// VehicleView is everything a renderer needs to draw one vehicle.
#[derive(Debug, Clone, Default)]
pub struct VehicleView {
    pub label: String,
    pub model_name: String,
    pub position: [f64; 3],
    pub forward: [f64; 3],
    pub side: [f64; 3],
    pub up: [f64; 3],
    pub velocity: f64,
    pub steering_angle: f64,
    pub wheel_rotation: f64,
    pub on_road: bool,
}

impl VehicleView {
    pub fn from_car(label: &str, car: &Car) -> VehicleView {
        let heading = car.heading();
        let pos = car.position();

        VehicleView {
            label: label.to_owned(),
            model_name: car.model_name.to_owned(),
            position: [pos.x, pos.y, pos.z],
            forward: [heading.forward.x, heading.forward.y, heading.forward.z],
            side: [heading.side.x, heading.side.y, heading.side.z],
            up: [heading.up.x, heading.up.y, heading.up.z],
            velocity: car.velocity,
            steering_angle: car.steering_angle,
            wheel_rotation: car.wheel_rotation,
            on_road: car.on_road,
        }
    }
}

/// RaceState is the snapshot published to the renderer. The player is always the first vehicle.
#[derive(Debug, Clone)]
pub struct RaceState {
    pub tick: u64,
    pub phase: RacePhase,
    pub paused: bool,
    pub compl_laps: u32,
    pub tot_no_laps: u32,
    pub vehicles: Vec<VehicleView>,

    // final standings (sent once the player finished)
    pub final_result: Option<RaceStandings>,
}
