use crate::core::utils::special::erfc;
use std::f64::consts::PI;

/// 12-6 Lennard-Jones energy from a squared distance. Zero for a non-interacting pair.
#[inline]
pub fn lennard_jones(dist_sq: f64, epsilon: f64, sigma: f64) -> f64 {
    if epsilon == 0.0 {
        return 0.0;
    }
    let s2 = sigma * sigma / dist_sq;
    let s6 = s2 * s2 * s2;
    4.0 * epsilon * (s6 * s6 - s6)
}

/// Value and radial derivative of the Lennard-Jones potential at `r_cut`, the
/// terms subtracted by the linear force shift
/// `u(r) - u(rc) - (r - rc) u'(rc)`.
#[inline]
pub fn lennard_jones_shift(epsilon: f64, sigma: f64, r_cut: f64) -> (f64, f64) {
    if epsilon == 0.0 {
        return (0.0, 0.0);
    }
    let s6 = (sigma / r_cut).powi(6);
    let energy = 4.0 * epsilon * (s6 * s6 - s6);
    let derivative = -24.0 * epsilon * (2.0 * s6 * s6 - s6) / r_cut;
    (energy, derivative)
}

/// Lorentz-Berthelot combining rules.
#[inline]
pub fn mix_lorentz_berthelot(eps_i: f64, sigma_i: f64, eps_j: f64, sigma_j: f64) -> (f64, f64) {
    ((eps_i * eps_j).sqrt(), 0.5 * (sigma_i + sigma_j))
}

/// Screened real-space Coulomb term of the Ewald sum, charges pre-scaled.
#[inline]
pub fn real_space_coulomb(dist: f64, qq: f64, alpha: f64) -> f64 {
    qq * erfc(alpha * dist) / dist
}

/// Integral of the Lennard-Jones potential beyond the cutoff,
/// `4 eps sigma^3 [ (sigma/rc)^9 / 9 - (sigma/rc)^3 / 3 ]`.
/// Multiplied by `2 pi N_a N_b / V` this gives the tail energy of a type pair.
#[inline]
pub fn lennard_jones_tail(epsilon: f64, sigma: f64, r_cut: f64) -> f64 {
    if epsilon == 0.0 {
        return 0.0;
    }
    let ratio3 = (sigma / r_cut).powi(3);
    4.0 * epsilon * sigma.powi(3) * (ratio3 * ratio3 * ratio3 / 9.0 - ratio3 / 3.0)
}

/// Tail energy of a homogeneous mixture, `2 pi / V * sum_ab N_a N_b I_ab`.
pub fn long_range_correction(counts: &[usize], tails: &[Vec<f64>], volume: f64) -> f64 {
    let mut sum = 0.0;
    for (a, &na) in counts.iter().enumerate() {
        for (b, &nb) in counts.iter().enumerate() {
            sum += na as f64 * nb as f64 * tails[a][b];
        }
    }
    2.0 * PI * sum / volume
}
