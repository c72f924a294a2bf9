use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};
use rand::Rng;
use std::f64::consts::PI;

/// Uniform random direction on the unit sphere (Marsaglia, 1972).
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Unit<Vector3<f64>> {
    loop {
        let u1 = 2.0 * rng.r#gen::<f64>() - 1.0;
        let u2 = 2.0 * rng.r#gen::<f64>() - 1.0;
        let s = u1 * u1 + u2 * u2;
        if s < 1.0 {
            let factor = 2.0 * (1.0 - s).sqrt();
            return Unit::new_unchecked(Vector3::new(u1 * factor, u2 * factor, 1.0 - 2.0 * s));
        }
    }
}

/// Uniform random orientation (Shoemake's subgroup algorithm).
pub fn random_orientation<R: Rng + ?Sized>(rng: &mut R) -> UnitQuaternion<f64> {
    let u1: f64 = rng.r#gen();
    let u2: f64 = rng.r#gen();
    let u3: f64 = rng.r#gen();
    let a = (1.0 - u1).sqrt();
    let b = u1.sqrt();
    let q = Quaternion::new(
        a * (2.0 * PI * u2).sin(),
        a * (2.0 * PI * u2).cos(),
        b * (2.0 * PI * u3).sin(),
        b * (2.0 * PI * u3).cos(),
    );
    UnitQuaternion::from_quaternion(q)
}

/// Rotation about a uniformly random axis by an angle uniform in `[-max_angle, max_angle]`.
pub fn random_rotation<R: Rng + ?Sized>(max_angle: f64, rng: &mut R) -> UnitQuaternion<f64> {
    let axis = random_unit_vector(rng);
    let angle = (2.0 * rng.r#gen::<f64>() - 1.0) * max_angle;
    UnitQuaternion::from_axis_angle(&axis, angle)
}

/// Uniform random vector in the cube `[-max, max]^3`.
pub fn random_displacement<R: Rng + ?Sized>(max: f64, rng: &mut R) -> Vector3<f64> {
    Vector3::new(
        (2.0 * rng.r#gen::<f64>() - 1.0) * max,
        (2.0 * rng.r#gen::<f64>() - 1.0) * max,
        (2.0 * rng.r#gen::<f64>() - 1.0) * max,
    )
}
