//! Imputation tests over the satellites generator.

mod common;

use common::*;
use composer::{ComposerConfig, ComposerError, Value};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
}

#[test]
fn test_missing_row() {
    let sat = satellites(ComposerConfig::default());
    let err = sat
        .composer
        .predict_confidence(None, PERIOD, 99, None, &mut rng())
        .unwrap_err();
    match &err {
        ComposerError::RowNotFound {
            table,
            generator,
            rowid,
        } => {
            assert_eq!(table, "satellites");
            assert_eq!(*generator, COMPOSED);
            assert_eq!(*rowid, 99);
        }
        other => panic!("expected RowNotFound, got {other:?}"),
    }
    assert!(err.to_string().contains("satellites"));
}

#[test]
fn test_local_without_observed_dependents_delegates() {
    let sat = satellites(ComposerConfig::default());
    let (value, conf) = sat
        .composer
        .predict_confidence(None, PERIGEE, ROW_ALTITUDES, None, &mut rng())
        .unwrap();
    assert_eq!(value, Value::Number(PERIGEE_KM));
    assert_eq!(conf, LOCAL_CONFIDENCE);
    assert_eq!(sat.recorder.predict_calls(), 1);
}

#[test]
fn test_local_with_observed_dependents_simulates() {
    let sat = satellites(ComposerConfig::default());
    let (value, conf) = sat
        .composer
        .predict_confidence(Some(0), PERIGEE, ROW_COMPLETE, Some(20), &mut rng())
        .unwrap();
    assert_eq!(value, Value::Number(PERIGEE_KM));
    // Every draw agrees.
    assert_eq!(conf, 1.0);
    assert_eq!(sat.recorder.predict_calls(), 0);
    assert_eq!(sat.recorder.simulate_calls(), 1);
}

#[test]
fn test_foreign_with_observed_conditions() {
    let sat = satellites(ComposerConfig::default());
    let (value, conf) = sat
        .composer
        .predict_confidence(None, PERIOD, ROW_ALTITUDES, None, &mut rng())
        .unwrap();
    assert_eq!(value, Value::Number(PERIOD_MINUTES));
    assert_eq!(conf, 1.0);
    assert_eq!(sat.recorder.predict_calls(), 0);
}

#[test]
fn test_one_missing_condition_imputed_once_before_predictor() {
    let sat = satellites(ComposerConfig::default());
    sat.composer
        .predict_confidence(None, PERIOD, ROW_APOGEE_ONLY, None, &mut rng())
        .unwrap();

    assert_eq!(sat.recorder.predict_calls(), 1);
    assert_eq!(
        sat.recorder.events(),
        vec![
            format!("base.predict_confidence(0, {ROW_APOGEE_ONLY})"),
            "Period_minutes.simulate(Apogee_km=800,Perigee_km=500)".to_string(),
        ]
    );
}

#[test]
fn test_confidence_non_increasing_with_recursion() {
    let sat = satellites(ComposerConfig::default());
    let (_, direct) = sat
        .composer
        .predict_confidence(None, PERIOD, ROW_ALTITUDES, None, &mut rng())
        .unwrap();
    let (_, recursive) = sat
        .composer
        .predict_confidence(None, PERIOD, ROW_APOGEE_ONLY, None, &mut rng())
        .unwrap();

    assert!((0.0..=1.0).contains(&direct));
    assert!((0.0..=1.0).contains(&recursive));
    assert!(recursive <= direct);
    assert!((recursive - LOCAL_CONFIDENCE).abs() < 1e-12);
}

#[test]
fn test_categorical_returns_sampled_mode() {
    let sat = satellites(ComposerConfig::default());
    let (value, conf) = sat
        .composer
        .predict_confidence(None, CLASS, ROW_ALTITUDES, None, &mut rng())
        .unwrap();
    assert_eq!(value, Value::from("LEO"));
    // Period imputed at full confidence; class at its predictor density.
    assert!((conf - CLASS_DENSITY).abs() < 1e-12);
}

#[test]
fn test_confidence_multiplies_down_the_chain() {
    let sat = satellites(ComposerConfig::default());
    let (_, conf) = sat
        .composer
        .predict_confidence(None, CLASS, ROW_APOGEE_ONLY, None, &mut rng())
        .unwrap();
    // class <- period <- perigee (base, 0.9)
    assert!((conf - CLASS_DENSITY * LOCAL_CONFIDENCE).abs() < 1e-12);
    assert_eq!(sat.recorder.predict_calls(), 1);
}

#[test]
fn test_unknown_stattype() {
    let sat = satellites(ComposerConfig::default());
    let err = sat
        .composer
        .predict_confidence(None, LONGITUDE, ROW_ALTITUDES, None, &mut rng())
        .unwrap_err();
    assert!(matches!(err, ComposerError::UnknownStatType { ref stattype } if stattype == "cyclic"));
}
