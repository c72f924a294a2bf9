//! Reciprocal-space part of the Ewald sum for a fixed orthorhombic cell.

use crate::core::models::simulation_box::SimulationBox;
use crate::core::utils::special::erf;
use itertools::Itertools;
use nalgebra::{Complex, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EwaldConfig {
    /// Screening parameter times the shortest cell edge.
    pub alpha_l: f64,
    /// Integer wave vectors with `0 < kx^2 + ky^2 + kz^2 < k2max` are summed.
    pub k2max: u32,
}

#[derive(Debug, Clone)]
pub struct Ewald {
    alpha: f64,
    kmax: i32,
    lengths: Vector3<f64>,
    wave_vectors: Vec<[i32; 3]>,
    prefactors: Vec<f64>,
}

impl Ewald {
    pub fn new(config: &EwaldConfig, simulation_box: &SimulationBox) -> Self {
        let alpha = config.alpha_l / simulation_box.min_length();
        let kmax = f64::from(config.k2max).sqrt().floor() as i32 + 1;
        let lengths = *simulation_box.lengths();
        let volume = simulation_box.volume();
        let k2max = config.k2max as i32;

        let mut wave_vectors = Vec::new();
        let mut prefactors = Vec::new();
        for kx in 0..=kmax {
            for ky in -kmax..=kmax {
                for kz in -kmax..=kmax {
                    let n2 = kx * kx + ky * ky + kz * kz;
                    if n2 == 0 || n2 >= k2max {
                        continue;
                    }
                    let k = Vector3::new(
                        2.0 * PI * f64::from(kx) / lengths.x,
                        2.0 * PI * f64::from(ky) / lengths.y,
                        2.0 * PI * f64::from(kz) / lengths.z,
                    );
                    let k_sq = k.norm_squared();
                    let symmetry = if kx == 0 { 1.0 } else { 2.0 };
                    wave_vectors.push([kx, ky, kz]);
                    prefactors.push(
                        2.0 * PI * symmetry * (-k_sq / (4.0 * alpha * alpha)).exp()
                            / (k_sq * volume),
                    );
                }
            }
        }

        Self {
            alpha,
            kmax,
            lengths,
            wave_vectors,
            prefactors,
        }
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    pub fn num_wave_vectors(&self) -> usize {
        self.wave_vectors.len()
    }

    pub fn wave_vectors(&self) -> &[[i32; 3]] {
        &self.wave_vectors
    }

    pub fn empty_structure_factor(&self) -> Vec<Complex<f64>> {
        vec![Complex::new(0.0, 0.0); self.wave_vectors.len()]
    }

    // phases[n + kmax] = exp(i n theta) for n in [-kmax, kmax]
    fn axis_phases(&self, theta: f64, phases: &mut Vec<Complex<f64>>) {
        let kmax = self.kmax as usize;
        phases.clear();
        phases.resize(2 * kmax + 1, Complex::new(1.0, 0.0));
        let step = Complex::new(theta.cos(), theta.sin());
        for n in 1..=kmax {
            let value = phases[kmax + n - 1] * step;
            phases[kmax + n] = value;
            phases[kmax - n] = value.conj();
        }
    }

    /// Adds `charge * exp(i k.r)` of one site to every entry of `structure_factor`.
    pub fn accumulate(
        &self,
        charge: f64,
        position: &Point3<f64>,
        structure_factor: &mut [Complex<f64>],
    ) {
        if charge == 0.0 {
            return;
        }
        let mut phases: [Vec<Complex<f64>>; 3] = Default::default();
        for (axis, axis_phases) in phases.iter_mut().enumerate() {
            let theta = 2.0 * PI * position[axis] / self.lengths[axis];
            self.axis_phases(theta, axis_phases);
        }
        let offset = self.kmax;
        for (s, k) in structure_factor.iter_mut().zip(&self.wave_vectors) {
            let phase = phases[0][(k[0] + offset) as usize]
                * phases[1][(k[1] + offset) as usize]
                * phases[2][(k[2] + offset) as usize];
            *s += phase * charge;
        }
    }

    /// Reciprocal-space energy of a structure factor.
    pub fn energy(&self, structure_factor: &[Complex<f64>]) -> f64 {
        structure_factor
            .iter()
            .zip(&self.prefactors)
            .map(|(s, p)| p * s.norm_sqr())
            .sum()
    }

    /// Self interaction of a rigid molecule's charges plus the intramolecular
    /// pairs the reciprocal sum counts but that must not interact.
    pub fn molecule_self_energy(&self, charges: &[f64], offsets: &[Vector3<f64>]) -> f64 {
        let point_self: f64 =
            self.alpha / PI.sqrt() * charges.iter().map(|q| q * q).sum::<f64>();
        let intramolecular: f64 = charges
            .iter()
            .zip(offsets)
            .tuple_combinations()
            .map(|((qi, ri), (qj, rj))| {
                let r = (rj - ri).norm();
                if r == 0.0 {
                    // coincident sites: limit of erf(alpha r)/r
                    qi * qj * 2.0 * self.alpha / PI.sqrt()
                } else {
                    qi * qj * erf(self.alpha * r) / r
                }
            })
            .sum();
        point_self + intramolecular
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic_ewald(length: f64, alpha_l: f64, k2max: u32) -> Ewald {
        Ewald::new(
            &EwaldConfig { alpha_l, k2max },
            &SimulationBox::cubic(length).unwrap(),
        )
    }

    #[test]
    fn wave_vectors_respect_strict_k2max_and_half_space() {
        let ewald = cubic_ewald(10.0, 5.6, 38);
        assert!(ewald.num_wave_vectors() > 0);
        for k in ewald.wave_vectors() {
            let n2 = k[0] * k[0] + k[1] * k[1] + k[2] * k[2];
            assert!(n2 > 0 && n2 < 38);
            assert!(k[0] >= 0);
        }
        assert!(!ewald.wave_vectors().contains(&[6, 1, 1]));
        assert!(ewald.wave_vectors().contains(&[6, 0, 0]));
    }

    #[test]
    fn wave_vector_count_for_small_cutoff() {
        // n^2 < 2: (1,0,0) plus (0,+-1,0) and (0,0,+-1)
        assert_eq!(cubic_ewald(10.0, 5.6, 2).num_wave_vectors(), 5);
    }

    #[test]
    fn alpha_is_scaled_by_shortest_edge() {
        let ewald = cubic_ewald(24.8586887, 5.6, 38);
        assert!((ewald.alpha() - 5.6 / 24.8586887).abs() < 1e-15);
    }

    #[test]
    fn accumulate_matches_direct_phase_evaluation() {
        let ewald = cubic_ewald(7.0, 5.6, 27);
        let r = Point3::new(1.3, -2.1, 5.9);
        let mut s = ewald.empty_structure_factor();
        ewald.accumulate(0.7, &r, &mut s);
        for (value, k) in s.iter().zip(ewald.wave_vectors()) {
            let kr = 2.0 * PI * (f64::from(k[0]) * r.x + f64::from(k[1]) * r.y + f64::from(k[2]) * r.z)
                / 7.0;
            let expected = Complex::new(kr.cos(), kr.sin()) * 0.7;
            assert!((value - expected).norm() < 1e-12);
        }
    }

    #[test]
    fn opposite_charges_at_same_site_cancel() {
        let ewald = cubic_ewald(7.0, 5.6, 27);
        let r = Point3::new(1.0, 2.0, 3.0);
        let mut s = ewald.empty_structure_factor();
        ewald.accumulate(1.0, &r, &mut s);
        ewald.accumulate(-1.0, &r, &mut s);
        assert!(ewald.energy(&s).abs() < 1e-20);
    }

    #[test]
    fn single_site_self_energy_is_point_term() {
        let ewald = cubic_ewald(10.0, 5.0, 10);
        let e = ewald.molecule_self_energy(&[2.0], &[Vector3::zeros()]);
        assert!((e - 0.5 / PI.sqrt() * 4.0).abs() < 1e-12);
    }
}
