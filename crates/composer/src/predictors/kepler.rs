//! Orbital period from Kepler's third law.
//!
//! For an Earth orbit with apogee and perigee altitudes h_a, h_p (km) the
//! semi-major axis is a = R + (h_a + h_p) / 2 and the period is
//! T = 2π √(a³ / GM). Observed periods scatter around T; the scatter is
//! modeled as a Gaussian residual fitted on the training rows.

use std::f64::consts::PI;

use composer_prob::GaussianDist;
use rand::RngCore;

use crate::error::{ComposerError, Result};
use crate::predictor::{ColumnSpec, Conditions, ForeignPredictor, TrainingData};
use crate::value::{StatType, Value};

use super::KEPLERS_LAW;

/// Equatorial radius of the Earth (km).
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// Standard gravitational parameter of the Earth (km³/s²).
pub const EARTH_GM_KM3_S2: f64 = 398_600.4418;

const MIN_RESIDUAL_STD: f64 = 1e-3;

/// Period in minutes of an orbit with the given altitudes in km.
pub fn period_minutes(apogee_km: f64, perigee_km: f64) -> f64 {
    let a = EARTH_RADIUS_KM + (apogee_km + perigee_km) / 2.0;
    2.0 * PI * (a.powi(3) / EARTH_GM_KM3_S2).sqrt() / 60.0
}

/// Period predictor conditioned on apogee and perigee (in either order).
#[derive(Debug, Clone, PartialEq)]
pub struct KeplersLaw {
    conditions: [String; 2],
    residual: GaussianDist,
}

impl KeplersLaw {
    pub fn train(data: &TrainingData, target: &ColumnSpec, conditions: &[ColumnSpec]) -> Result<Self> {
        let [c0, c1] = conditions else {
            return Err(invalid(format!(
                "needs exactly two conditions (apogee, perigee), got {}",
                conditions.len()
            )));
        };
        for spec in [target, c0, c1] {
            if spec.stattype.parse::<StatType>()? != StatType::Numerical {
                return Err(invalid(format!("column {} must be numerical", spec.name)));
            }
        }

        let rows = data.complete(&[target.name.as_str(), c0.name.as_str(), c1.name.as_str()])?;
        let residuals: Vec<f64> = rows
            .iter()
            .filter_map(|row| {
                let period = row[0].as_f64()?;
                let h0 = row[1].as_f64()?;
                let h1 = row[2].as_f64()?;
                Some(period - period_minutes(h0, h1))
            })
            .collect();

        let residual = if residuals.len() < 2 {
            GaussianDist::standard()
        } else {
            let fit = GaussianDist::fit(&residuals)?;
            GaussianDist::new(fit.mean, fit.std_dev.max(MIN_RESIDUAL_STD))?
        };

        Ok(Self {
            conditions: [c0.name.clone(), c1.name.clone()],
            residual,
        })
    }

    /// Residual distribution around the theoretical period.
    pub fn residual(&self) -> &GaussianDist {
        &self.residual
    }

    fn predicted(&self, conditions: &Conditions) -> Result<f64> {
        let mut altitudes = [0.0; 2];
        for (slot, name) in altitudes.iter_mut().zip(&self.conditions) {
            let value = conditions
                .get(name)
                .ok_or_else(|| ComposerError::MissingConditionValue { name: name.clone() })?;
            *slot = value
                .as_f64()
                .ok_or_else(|| invalid(format!("condition {name} is not numerical: {value}")))?;
        }
        Ok(period_minutes(altitudes[0], altitudes[1]))
    }
}

fn invalid(reason: String) -> ComposerError {
    ComposerError::InvalidPredictor {
        kind: KEPLERS_LAW.to_string(),
        reason,
    }
}

impl ForeignPredictor for KeplersLaw {
    fn simulate(
        &self,
        n: usize,
        conditions: &Conditions,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Value>> {
        let period = self.predicted(conditions)?;
        Ok((0..n)
            .map(|_| Value::Number(period + self.residual.sample(&mut *rng)))
            .collect())
    }

    fn logpdf(&self, value: &Value, conditions: &Conditions) -> Result<f64> {
        let period = self.predicted(conditions)?;
        let x = value
            .as_f64()
            .ok_or_else(|| invalid(format!("period is not numerical: {value}")))?;
        Ok(self.residual.log_pdf(x - period))
    }
}
