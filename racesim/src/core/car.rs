use crate::core::replay::HeldControls;
use anyhow::Context;
use helpers::general::InputValueError;
use nalgebra::Vector3;
use serde::Deserialize;
use std::str::FromStr;

/// Per car model tuning constants, stored in the options file as `AxBxCxDxE`.
/// * `steering_speed` - Steering angle change per steer input, also scales the steering effect
/// * `acceleration` - Gas added per accelerate input
/// * `brake_effectiveness` - Velocity removed per brake input
/// * `top_speed` - Velocity gained per tick at 100 % gas
/// * `friction` - Velocity multiplier per tick while the car is on the road
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CarPars {
    pub steering_speed: f64,
    pub acceleration: f64,
    pub brake_effectiveness: f64,
    pub top_speed: f64,
    pub friction: f64,
}

impl FromStr for CarPars {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<CarPars> {
        let fields: Vec<&str> = s
            .split(|c| c == 'x' || c == 'X' || c == '×' || c == ':')
            .map(str::trim)
            .collect();

        if fields.len() != 5 {
            return Err(InputValueError::new(format!(
                "car attributes {:?} must contain 5 values, found {}",
                s,
                fields.len()
            ))
            .into());
        }

        let mut vals = [0.0; 5];
        for (val, field) in vals.iter_mut().zip(fields.iter()) {
            *val = field
                .parse::<f64>()
                .with_context(|| format!("Could not parse car attribute {:?} in {:?}!", field, s))?;
        }

        Ok(CarPars {
            steering_speed: vals[0],
            acceleration: vals[1],
            brake_effectiveness: vals[2],
            top_speed: vals[3],
            friction: vals[4],
        })
    }
}

/// Tuning constants of the integration step that are shared by all car models.
/// * `max_steering_angle` - Bound of the steering angle magnitude
/// * `friction_off_road` - Velocity multiplier per tick while the car is off the road
/// * `steering_return` - Steering angle multiplier per tick while the steering has an effect
/// * `min_steer_velocity` - Velocity that must be exceeded before steering changes the heading
/// * `steer_effect_threshold` - Minimum `|angle| * steering_speed` that changes the heading
/// * `yaw_divisor` - Scales `angle * steering_speed * velocity` into a yaw change
/// * `distance_divisor` - Scales velocity into distance travelled per tick
/// * `wheel_spin_divisor` - Scales velocity into cosmetic wheel rotation per tick
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct KinematicPars {
    pub max_steering_angle: f64,
    pub friction_off_road: f64,
    pub steering_return: f64,
    pub min_steer_velocity: f64,
    pub steer_effect_threshold: f64,
    pub yaw_divisor: f64,
    pub distance_divisor: f64,
    pub wheel_spin_divisor: f64,
}

impl Default for KinematicPars {
    fn default() -> Self {
        KinematicPars {
            max_steering_angle: 1.0,
            friction_off_road: 0.98,
            steering_return: 0.99,
            min_steer_velocity: 10.0,
            steer_effect_threshold: 0.001,
            yaw_divisor: 500.0,
            distance_divisor: 2000.0,
            wheel_spin_divisor: 2000.0,
        }
    }
}

/// Orthonormal basis describing where a vehicle points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heading {
    pub forward: Vector3<f64>,
    pub side: Vector3<f64>,
    pub up: Vector3<f64>,
}

/// Anything that is moved by the simulation once per tick. Rendering reads the state through
/// this interface only.
pub trait Kinematic {
    fn integrate(&mut self);
    fn position(&self) -> Vector3<f64>;
    fn heading(&self) -> Heading;
}

#[derive(Debug, Clone)]
pub struct Car {
    pub model_id: usize,
    pub model_name: String,
    pars: CarPars,
    kin_pars: KinematicPars,
    pos: Vector3<f64>,
    // (pitch, yaw, roll)
    rotation: Vector3<f64>,
    heading: Heading,
    pub velocity: f64,
    pub steering_angle: f64,
    pub gas: f64,
    pub on_road: bool,
    pub wheel_rotation: f64,
}

impl Car {
    pub fn new(
        model_id: usize,
        model_name: &str,
        car_pars: &CarPars,
        kin_pars: &KinematicPars,
        pos: Vector3<f64>,
        rotation: Vector3<f64>,
    ) -> Car {
        let mut car = Car {
            model_id,
            model_name: model_name.to_owned(),
            pars: *car_pars,
            kin_pars: *kin_pars,
            pos,
            rotation,
            heading: Heading {
                forward: Vector3::new(0.0, 0.0, -1.0),
                side: Vector3::new(1.0, 0.0, 0.0),
                up: Vector3::y(),
            },
            velocity: 0.0,
            steering_angle: 0.0,
            gas: 0.0,
            on_road: true,
            wheel_rotation: 0.0,
        };
        car.update_heading();
        car
    }

    pub fn yaw(&self) -> f64 {
        self.rotation.y
    }

    /// accelerate adds gas unless that would push it above 100.
    pub fn accelerate(&mut self) {
        if self.gas <= 100.0 - self.pars.acceleration {
            self.gas += self.pars.acceleration;
        }
    }

    /// hit_brake removes velocity. Braking never reverses the car, it stops at zero.
    pub fn hit_brake(&mut self) {
        self.velocity = (self.velocity - self.pars.brake_effectiveness).max(0.0);
    }

    /// rotate turns the steering wheel by one step to the left (`true`) or right (`false`).
    /// A step that would leave `[-max_steering_angle, max_steering_angle]` is refused.
    pub fn rotate(&mut self, left: bool) {
        let max = self.kin_pars.max_steering_angle;
        let step = self.pars.steering_speed;

        if left {
            if self.steering_angle <= max - step {
                self.steering_angle = (self.steering_angle + step).min(max);
            }
        } else if self.steering_angle >= -max + step {
            self.steering_angle = (self.steering_angle - step).max(-max);
        }
    }

    /// apply_controls applies every held control once, in code order.
    pub fn apply_controls(&mut self, controls: &HeldControls) {
        if controls.accelerate {
            self.accelerate();
        }
        if controls.brake {
            self.hit_brake();
        }
        if controls.steer_left {
            self.rotate(true);
        }
        if controls.steer_right {
            self.rotate(false);
        }
    }

    fn update_heading(&mut self) {
        let pitch = self.rotation.x;
        let yaw = self.rotation.y;

        let forward = Vector3::new(
            yaw.sin() * pitch.cos(),
            pitch.sin(),
            yaw.cos() * pitch.cos(),
        )
        .normalize();
        let side = forward.cross(&Vector3::y()).normalize();
        let up = side.cross(&forward).normalize();

        self.heading = Heading { forward, side, up };
    }
}

impl Kinematic for Car {
    /// integrate advances the car by one tick. The order of the steps is fixed, replays depend on
    /// it.
    fn integrate(&mut self) {
        // gas decays before propulsion is applied
        if self.gas >= 1.0 {
            self.gas -= 1.0;
        }
        if self.gas > 0.0 {
            self.velocity += (self.gas / 100.0) * self.pars.top_speed;
        }

        if self.on_road {
            self.velocity *= self.pars.friction;
        } else {
            self.velocity *= self.kin_pars.friction_off_road;
        }

        // cosmetic only
        if self.velocity >= 1.0 {
            self.wheel_rotation += self.velocity / self.kin_pars.wheel_spin_divisor;
        }

        if self.steering_angle.abs() * self.pars.steering_speed
            >= self.kin_pars.steer_effect_threshold
            && self.velocity > self.kin_pars.min_steer_velocity
        {
            self.rotation.y +=
                self.steering_angle * self.pars.steering_speed * self.velocity / self.kin_pars.yaw_divisor;
            self.steering_angle *= self.kin_pars.steering_return;
        }

        self.update_heading();
        self.pos += self.heading.forward * self.velocity / self.kin_pars.distance_divisor;
    }

    fn position(&self) -> Vector3<f64> {
        self.pos
    }

    fn heading(&self) -> Heading {
        self.heading
    }
}
