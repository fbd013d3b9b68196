//! Predictor kinds shipped with the crate.
//!
//! - `keplers_law`: orbital period from apogee and perigee
//! - `conditional_table`: categorical target given categorical conditions

mod kepler;
mod table;

pub use kepler::{period_minutes, KeplersLaw, EARTH_GM_KM3_S2, EARTH_RADIUS_KM};
pub use table::{ConditionalTable, DEFAULT_ALPHA};

use crate::predictor::{ForeignPredictor, PredictorRegistry};

/// Registry key of [`KeplersLaw`].
pub const KEPLERS_LAW: &str = "keplers_law";

/// Registry key of [`ConditionalTable`].
pub const CONDITIONAL_TABLE: &str = "conditional_table";

pub(crate) fn register_builtins(registry: &mut PredictorRegistry) {
    registry.register(KEPLERS_LAW, |data, target, conditions| {
        let predictor = KeplersLaw::train(data, target, conditions)?;
        Ok(Box::new(predictor) as Box<dyn ForeignPredictor>)
    });
    registry.register(CONDITIONAL_TABLE, |data, target, conditions| {
        let predictor = ConditionalTable::train(data, target, conditions)?;
        Ok(Box::new(predictor) as Box<dyn ForeignPredictor>)
    });
}
