use super::ewald::{Ewald, EwaldConfig};
use super::potentials::{
    lennard_jones, lennard_jones_shift, lennard_jones_tail, long_range_correction,
    mix_lorentz_berthelot, real_space_coulomb,
};
use super::term::EnergyTerm;
use crate::core::models::molecule::Molecule;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::space::{Space, SpaceError};
use crate::core::utils::constants::charge_scale;
use nalgebra::{Complex, Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PairError {
    #[error("Cutoff {r_cut} must be positive and at most half the shortest cell edge ({max})")]
    InvalidCutoff { r_cut: f64, max: f64 },
    #[error("Ewald screening parameter alpha*L must be positive and finite, got {0}")]
    InvalidScreening(f64),
    #[error("Molecule template {0} has no interaction parameters")]
    UnparameterizedTemplate(usize),
    #[error("Site type '{site_type}' is defined with conflicting epsilon/sigma values")]
    InconsistentSiteType { site_type: String },
    #[error(
        "Stored energy {stored} differs from recomputed energy {recomputed} beyond tolerance {tolerance}"
    )]
    EnergyDrift {
        stored: f64,
        recomputed: f64,
        tolerance: f64,
    },
    #[error(transparent)]
    Space(#[from] SpaceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    pub r_cut: f64,
    pub ewald: EwaldConfig,
    /// Add the analytic Lennard-Jones tail beyond the cutoff.
    pub long_range_correction: bool,
    /// Subtract the Lennard-Jones energy and force at `r_cut` from every site
    /// pair, so both vanish at the cutoff.
    #[serde(default)]
    pub linear_shift: bool,
}

/// Energy difference of a proposed move together with the structure factor
/// the system would have after it. Nothing is stored until [`PairLjCoulEwald::commit`].
#[derive(Debug, Clone)]
pub struct EnergyChange {
    pub delta: EnergyTerm,
    pub structure_factor: Vec<Complex<f64>>,
}

#[derive(Debug, Clone, Copy)]
struct SiteParams {
    charge: f64,
    type_index: usize,
}

#[derive(Clone, Copy)]
struct Pose<'a> {
    template: usize,
    position: &'a Point3<f64>,
    offsets: &'a [Vector3<f64>],
}

impl<'a> Pose<'a> {
    fn of(molecule: &'a Molecule) -> Self {
        Self {
            template: molecule.template,
            position: &molecule.position,
            offsets: &molecule.offsets,
        }
    }
}

/// Lennard-Jones plus Ewald-summed Coulomb interactions between rigid molecules,
/// with the running energy and structure factor of the current configuration.
///
/// The cutoff is applied between reference sites: two molecules interact through
/// all their site pairs when their reference sites are closer than `r_cut`.
#[derive(Debug, Clone)]
pub struct PairLjCoulEwald {
    config: PairConfig,
    simulation_box: SimulationBox,
    ewald: Ewald,
    r_cut_sq: f64,
    sites: Vec<Vec<SiteParams>>,
    lj_table: Vec<Vec<(f64, f64)>>,
    tail_table: Vec<Vec<f64>>,
    // (u(rc), u'(rc)) per type pair; zeros without the linear shift
    shift_table: Vec<Vec<(f64, f64)>>,
    // [template][type] -> number of sites
    type_counts: Vec<Vec<usize>>,
    template_self: Vec<f64>,
    energy: EnergyTerm,
    structure_factor: Vec<Complex<f64>>,
}

impl PairLjCoulEwald {
    /// Builds the potential for the templates and cell of `space` and computes
    /// the energy of its current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PairError::InvalidCutoff`] if `r_cut` is not in `(0, L_min / 2]`,
    /// [`PairError::InvalidScreening`] for a non-positive `alpha_l`, and
    /// [`PairError::InconsistentSiteType`] if two sites share a type label but not
    /// their Lennard-Jones parameters.
    pub fn new(config: PairConfig, space: &Space) -> Result<Self, PairError> {
        let simulation_box = *space.simulation_box();
        let max_cut = simulation_box.min_length() / 2.0;
        if !(config.r_cut > 0.0 && config.r_cut <= max_cut * (1.0 + 1e-12)) {
            return Err(PairError::InvalidCutoff {
                r_cut: config.r_cut,
                max: max_cut,
            });
        }
        if !(config.ewald.alpha_l.is_finite() && config.ewald.alpha_l > 0.0) {
            return Err(PairError::InvalidScreening(config.ewald.alpha_l));
        }
        let ewald = Ewald::new(&config.ewald, &simulation_box);

        let mut type_index: HashMap<&str, usize> = HashMap::new();
        let mut type_params: Vec<(f64, f64)> = Vec::new();
        let mut sites = Vec::with_capacity(space.templates().len());
        for template in space.templates() {
            let mut params = Vec::with_capacity(template.num_sites());
            for site in &template.sites {
                let index = match type_index.get(site.site_type.as_str()) {
                    Some(&index) => {
                        if type_params[index] != (site.epsilon, site.sigma) {
                            return Err(PairError::InconsistentSiteType {
                                site_type: site.site_type.clone(),
                            });
                        }
                        index
                    }
                    None => {
                        type_params.push((site.epsilon, site.sigma));
                        type_index.insert(&site.site_type, type_params.len() - 1);
                        type_params.len() - 1
                    }
                };
                params.push(SiteParams {
                    charge: site.charge * charge_scale(),
                    type_index: index,
                });
            }
            sites.push(params);
        }

        let lj_table: Vec<Vec<(f64, f64)>> = type_params
            .iter()
            .map(|&(ei, si)| {
                type_params
                    .iter()
                    .map(|&(ej, sj)| mix_lorentz_berthelot(ei, si, ej, sj))
                    .collect()
            })
            .collect();
        let tail_table = lj_table
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&(eps, sigma)| lennard_jones_tail(eps, sigma, config.r_cut))
                    .collect()
            })
            .collect();
        let shift_table = lj_table
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&(eps, sigma)| match config.linear_shift {
                        true => lennard_jones_shift(eps, sigma, config.r_cut),
                        false => (0.0, 0.0),
                    })
                    .collect()
            })
            .collect();
        let type_counts = sites
            .iter()
            .map(|params| {
                let mut counts = vec![0; type_params.len()];
                for p in params {
                    counts[p.type_index] += 1;
                }
                counts
            })
            .collect();
        let template_self = space
            .templates()
            .iter()
            .zip(&sites)
            .map(|(template, params)| {
                let charges: Vec<f64> = params.iter().map(|p| p.charge).collect();
                let offsets = template.oriented_offsets(&UnitQuaternion::identity());
                ewald.molecule_self_energy(&charges, &offsets)
            })
            .collect();

        let structure_factor = ewald.empty_structure_factor();
        debug!(
            wave_vectors = ewald.num_wave_vectors(),
            alpha = ewald.alpha(),
            "Built Ewald reciprocal space."
        );

        let mut pair = Self {
            config,
            simulation_box,
            ewald,
            r_cut_sq: config.r_cut * config.r_cut,
            sites,
            lj_table,
            tail_table,
            shift_table,
            type_counts,
            template_self,
            energy: EnergyTerm::default(),
            structure_factor,
        };
        pair.init_energy(space)?;
        Ok(pair)
    }

    #[inline]
    pub fn config(&self) -> &PairConfig {
        &self.config
    }

    #[inline]
    pub fn ewald(&self) -> &Ewald {
        &self.ewald
    }

    /// Stored energy components of the current configuration.
    #[inline]
    pub fn energy(&self) -> &EnergyTerm {
        &self.energy
    }

    /// Stored total potential energy.
    #[inline]
    pub fn total(&self) -> f64 {
        self.energy.total()
    }

    /// Recomputes every component and the structure factor from scratch.
    #[instrument(skip_all, fields(molecules = space.num_molecules()))]
    pub fn init_energy(&mut self, space: &Space) -> Result<(), PairError> {
        let (energy, structure_factor) = self.compute(space)?;
        self.energy = energy;
        self.structure_factor = structure_factor;
        debug!(total = energy.total(), "Initialized energy.");
        Ok(())
    }

    /// Compares the stored energy against a full recomputation and resynchronizes
    /// the stored state when they agree.
    ///
    /// # Errors
    ///
    /// Returns [`PairError::EnergyDrift`] when the totals differ by more than
    /// `tolerance * max(1, |recomputed|)`.
    pub fn check_energy(&mut self, space: &Space, tolerance: f64) -> Result<EnergyTerm, PairError> {
        let (recomputed, structure_factor) = self.compute(space)?;
        let stored = self.energy.total();
        let scale = recomputed.total().abs().max(1.0);
        if (stored - recomputed.total()).abs() > tolerance * scale {
            return Err(PairError::EnergyDrift {
                stored,
                recomputed: recomputed.total(),
                tolerance,
            });
        }
        self.energy = recomputed;
        self.structure_factor = structure_factor;
        Ok(recomputed)
    }

    /// Full energy of a configuration without touching the stored state.
    pub fn compute(&self, space: &Space) -> Result<(EnergyTerm, Vec<Complex<f64>>), PairError> {
        let molecules = space.molecules();
        if let Some(m) = molecules.iter().find(|m| m.template >= self.sites.len()) {
            return Err(PairError::UnparameterizedTemplate(m.template));
        }

        #[cfg(feature = "parallel")]
        let rows: Vec<EnergyTerm> = (0..molecules.len())
            .into_par_iter()
            .map(|i| self.row_energy(molecules, i))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<EnergyTerm> = (0..molecules.len())
            .map(|i| self.row_energy(molecules, i))
            .collect();
        let mut energy: EnergyTerm = rows.into_iter().sum();

        let mut structure_factor = self.ewald.empty_structure_factor();
        for molecule in molecules {
            self.add_sites(&Pose::of(molecule), 1.0, &mut structure_factor);
        }
        energy.fourier = self.ewald.energy(&structure_factor);
        energy.self_energy = molecules
            .iter()
            .map(|m| self.template_self[m.template])
            .sum();
        energy.lrc = self.lrc_for_counts(&space.molecule_counts());
        Ok((energy, structure_factor))
    }

    /// Energy change of moving molecule `index` to a new reference position and orientation.
    pub fn propose_displacement(
        &self,
        space: &Space,
        index: usize,
        position: &Point3<f64>,
        offsets: &[Vector3<f64>],
    ) -> Result<EnergyChange, PairError> {
        let molecule = space.molecule(index)?;
        let old_pose = Pose::of(molecule);
        let wrapped = self.simulation_box.wrap(position);
        let new_pose = Pose {
            template: molecule.template,
            position: &wrapped,
            offsets,
        };

        let old = self.interaction_with_others(space, &old_pose, Some(index));
        let new = self.interaction_with_others(space, &new_pose, Some(index));
        let mut structure_factor = self.structure_factor.clone();
        self.add_sites(&old_pose, -1.0, &mut structure_factor);
        self.add_sites(&new_pose, 1.0, &mut structure_factor);

        let delta = EnergyTerm {
            lj: new.lj - old.lj,
            real: new.real - old.real,
            fourier: self.ewald.energy(&structure_factor) - self.energy.fourier,
            ..Default::default()
        };
        Ok(EnergyChange {
            delta,
            structure_factor,
        })
    }

    /// Energy change of adding `molecule`, which is not yet part of `space`.
    pub fn propose_insertion(
        &self,
        space: &Space,
        molecule: &Molecule,
    ) -> Result<EnergyChange, PairError> {
        if molecule.template >= self.sites.len() {
            return Err(PairError::UnparameterizedTemplate(molecule.template));
        }
        let pose = Pose::of(molecule);
        let interaction = self.interaction_with_others(space, &pose, None);
        let mut structure_factor = self.structure_factor.clone();
        self.add_sites(&pose, 1.0, &mut structure_factor);

        let mut counts = space.molecule_counts();
        counts.resize(self.sites.len(), 0);
        counts[molecule.template] += 1;

        let delta = EnergyTerm {
            lj: interaction.lj,
            real: interaction.real,
            fourier: self.ewald.energy(&structure_factor) - self.energy.fourier,
            lrc: self.lrc_for_counts(&counts) - self.energy.lrc,
            self_energy: self.template_self[molecule.template],
        };
        Ok(EnergyChange {
            delta,
            structure_factor,
        })
    }

    /// Energy change of removing molecule `index`.
    pub fn propose_removal(&self, space: &Space, index: usize) -> Result<EnergyChange, PairError> {
        let molecule = space.molecule(index)?;
        let pose = Pose::of(molecule);
        let interaction = self.interaction_with_others(space, &pose, Some(index));
        let mut structure_factor = self.structure_factor.clone();
        self.add_sites(&pose, -1.0, &mut structure_factor);

        let mut counts = space.molecule_counts();
        counts[molecule.template] -= 1;

        let delta = EnergyTerm {
            lj: -interaction.lj,
            real: -interaction.real,
            fourier: self.ewald.energy(&structure_factor) - self.energy.fourier,
            lrc: self.lrc_for_counts(&counts) - self.energy.lrc,
            self_energy: -self.template_self[molecule.template],
        };
        Ok(EnergyChange {
            delta,
            structure_factor,
        })
    }

    /// Applies an accepted change.
    pub fn commit(&mut self, change: EnergyChange) {
        self.energy += change.delta;
        self.structure_factor = change.structure_factor;
    }

    fn add_sites(&self, pose: &Pose, sign: f64, structure_factor: &mut [Complex<f64>]) {
        for (params, offset) in self.sites[pose.template].iter().zip(pose.offsets) {
            let position = pose.position + offset;
            self.ewald
                .accumulate(sign * params.charge, &position, structure_factor);
        }
    }

    fn row_energy(&self, molecules: &[Molecule], i: usize) -> EnergyTerm {
        let pose_i = Pose::of(&molecules[i]);
        molecules[i + 1..]
            .iter()
            .map(|m| self.pair_energy(&pose_i, &Pose::of(m)))
            .sum()
    }

    fn interaction_with_others(&self, space: &Space, pose: &Pose, skip: Option<usize>) -> EnergyTerm {
        space
            .molecules()
            .iter()
            .enumerate()
            .filter(|(j, _)| Some(*j) != skip)
            .map(|(_, m)| self.pair_energy(pose, &Pose::of(m)))
            .sum()
    }

    fn pair_energy(&self, a: &Pose, b: &Pose) -> EnergyTerm {
        let d = self
            .simulation_box
            .minimum_image(&(b.position - a.position));
        if d.norm_squared() >= self.r_cut_sq {
            return EnergyTerm::default();
        }
        let alpha = self.ewald.alpha();
        let mut term = EnergyTerm::default();
        for (pa, oa) in self.sites[a.template].iter().zip(a.offsets) {
            for (pb, ob) in self.sites[b.template].iter().zip(b.offsets) {
                let r = d + ob - oa;
                let r2 = r.norm_squared();
                let (eps, sigma) = self.lj_table[pa.type_index][pb.type_index];
                term.lj += lennard_jones(r2, eps, sigma);
                let (u_c, du_c) = self.shift_table[pa.type_index][pb.type_index];
                if self.config.linear_shift {
                    term.lj -= u_c + (r2.sqrt() - self.config.r_cut) * du_c;
                }
                let qq = pa.charge * pb.charge;
                if qq != 0.0 {
                    term.real += real_space_coulomb(r2.sqrt(), qq, alpha);
                }
            }
        }
        term
    }

    fn lrc_for_counts(&self, molecule_counts: &[usize]) -> f64 {
        if !self.config.long_range_correction {
            return 0.0;
        }
        let num_types = self.lj_table.len();
        let mut site_counts = vec![0usize; num_types];
        for (template, &n) in molecule_counts.iter().enumerate() {
            if let Some(per_type) = self.type_counts.get(template) {
                for (count, &per_molecule) in site_counts.iter_mut().zip(per_type) {
                    *count += n * per_molecule;
                }
            }
        }
        long_range_correction(&site_counts, &self.tail_table, self.simulation_box.volume())
    }
}
