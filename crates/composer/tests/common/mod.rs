//! Shared fixtures for the composer integration tests.
//!
//! - `MockBase`: independent local columns, fixed value probability,
//!   deterministic simulation and imputation, call counters
//! - `ConstantPredictor`: always draws the same value, logs every call
//!   with the condition values it was given
//! - `CoinBase` / `NoisyCopy`: binary columns whose draws vary, for the
//!   importance estimators
//! - `satellites()` / `twins()` / `coins()`: ready-made composed generators
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use composer::{
    AnalyzeOptions, BaseColNo, BaseModel, ColNo, Composer, ComposerConfig, CompositionSpec,
    Conditions, ForeignPredictor, GeneratorId, MemoryCatalog, ModelNo, PredictorRegistry, Result,
    RowId, Value,
};
use rand::{Rng, RngCore};

pub const COMPOSED: GeneratorId = GeneratorId(1);
pub const BASE: GeneratorId = GeneratorId(2);

/// Probability the mock base assigns to every local value.
pub const LOCAL_PROB: f64 = 0.5;

/// Confidence the mock base reports for its own imputations.
pub const LOCAL_CONFIDENCE: f64 = 0.9;

/// Mutual information the mock base reports for distinct columns.
pub const BASE_MI: f64 = 0.125;

/// Similarity the mock base reports for any pair of rows.
pub const BASE_SIMILARITY: f64 = 0.75;

// ============================================================================
// Recorder
// ============================================================================

/// Call counters and an ordered event log shared by the mocks.
#[derive(Debug, Default)]
pub struct Recorder {
    pub simulate_calls: AtomicUsize,
    pub predict_calls: AtomicUsize,
    pub analyze_calls: AtomicUsize,
    pub events: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn simulate_calls(&self) -> usize {
        self.simulate_calls.load(Ordering::SeqCst)
    }

    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Mock base model
// ============================================================================

/// Base model with independent columns.
///
/// Column `b` always simulates and imputes to `values[b]`; every value has
/// probability [`LOCAL_PROB`] regardless of constraints.
pub struct MockBase {
    values: Vec<Value>,
    dependence: f64,
    recorder: Arc<Recorder>,
}

impl MockBase {
    pub fn new(values: Vec<Value>, recorder: Arc<Recorder>) -> Self {
        Self {
            values,
            dependence: 0.0,
            recorder,
        }
    }

    /// Dependence reported for distinct columns.
    pub fn with_dependence(mut self, dependence: f64) -> Self {
        self.dependence = dependence;
        self
    }
}

impl BaseModel for MockBase {
    fn simulate(
        &self,
        _modelno: Option<ModelNo>,
        _constraints: &[(BaseColNo, Value)],
        targets: &[BaseColNo],
        n: usize,
        _rng: &mut dyn RngCore,
    ) -> Result<Vec<Vec<Value>>> {
        self.recorder.simulate_calls.fetch_add(1, Ordering::SeqCst);
        let draw: Vec<Value> = targets.iter().map(|b| self.values[b.0].clone()).collect();
        Ok(vec![draw; n])
    }

    fn column_value_probability(
        &self,
        _modelno: Option<ModelNo>,
        _colno: BaseColNo,
        _value: &Value,
        _constraints: &[(BaseColNo, Value)],
    ) -> Result<f64> {
        Ok(LOCAL_PROB)
    }

    fn column_dependence_probability(
        &self,
        _modelno: Option<ModelNo>,
        colno0: BaseColNo,
        colno1: BaseColNo,
    ) -> Result<f64> {
        Ok(if colno0 == colno1 { 1.0 } else { self.dependence })
    }

    fn column_mutual_information(
        &self,
        _modelno: Option<ModelNo>,
        _colno0: BaseColNo,
        _colno1: BaseColNo,
        _numsamples: usize,
    ) -> Result<f64> {
        Ok(BASE_MI)
    }

    fn row_similarity(
        &self,
        _modelno: Option<ModelNo>,
        _rowid: RowId,
        _target_rowid: RowId,
        _colnos: &[BaseColNo],
    ) -> Result<f64> {
        Ok(BASE_SIMILARITY)
    }

    fn predict_confidence(
        &self,
        _modelno: Option<ModelNo>,
        colno: BaseColNo,
        rowid: RowId,
    ) -> Result<(Value, f64)> {
        self.recorder.predict_calls.fetch_add(1, Ordering::SeqCst);
        self.recorder.record(format!("base.predict_confidence({colno}, {rowid})"));
        Ok((self.values[colno.0].clone(), LOCAL_CONFIDENCE))
    }

    fn analyze_models(
        &mut self,
        _modelnos: Option<&[ModelNo]>,
        _options: &AnalyzeOptions,
    ) -> Result<()> {
        self.recorder.analyze_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Constant predictor
// ============================================================================

/// Always draws `value`; density `exp(log_density)` at `value`, zero elsewhere.
pub struct ConstantPredictor {
    name: String,
    value: Value,
    log_density: f64,
    recorder: Arc<Recorder>,
}

impl ForeignPredictor for ConstantPredictor {
    fn simulate(
        &self,
        n: usize,
        conditions: &Conditions,
        _rng: &mut dyn RngCore,
    ) -> Result<Vec<Value>> {
        let given: Vec<String> = conditions
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        self.recorder
            .record(format!("{}.simulate({})", self.name, given.join(",")));
        Ok(vec![self.value.clone(); n])
    }

    fn logpdf(&self, value: &Value, _conditions: &Conditions) -> Result<f64> {
        Ok(if *value == self.value {
            self.log_density
        } else {
            f64::NEG_INFINITY
        })
    }
}

/// Registry with a single `constant` kind; each target column draws the
/// `(value, density)` listed for it.
pub fn constant_registry(outputs: &[(&str, Value, f64)], recorder: &Arc<Recorder>) -> PredictorRegistry {
    let outputs: BTreeMap<String, (Value, f64)> = outputs
        .iter()
        .map(|(name, value, p)| (name.to_string(), (value.clone(), p.ln())))
        .collect();
    let recorder = Arc::clone(recorder);

    let mut registry = PredictorRegistry::new();
    registry.register("constant", move |_data, target, _conditions| {
        let (value, log_density) = outputs.get(&target.name).cloned().ok_or_else(|| {
            composer::ComposerError::InvalidPredictor {
                kind: "constant".to_string(),
                reason: format!("no output for {}", target.name),
            }
        })?;
        Ok(Box::new(ConstantPredictor {
            name: target.name.clone(),
            value,
            log_density,
            recorder: Arc::clone(&recorder),
        }) as Box<dyn ForeignPredictor>)
    });
    registry
}

// ============================================================================
// Satellites
// ============================================================================

pub const PERIGEE: ColNo = 0;
pub const APOGEE: ColNo = 1;
pub const PERIOD: ColNo = 2;
pub const CLASS: ColNo = 3;
pub const LONGITUDE: ColNo = 4;

pub const PERIGEE_KM: f64 = 500.0;
pub const APOGEE_KM: f64 = 800.0;
pub const PERIOD_MINUTES: f64 = 100.0;
pub const CLASS_DENSITY: f64 = 0.8;

/// Row with every column observed.
pub const ROW_COMPLETE: RowId = 1;
/// Row with only the apogee observed.
pub const ROW_APOGEE_ONLY: RowId = 2;
/// Row with both altitudes observed and nothing else.
pub const ROW_ALTITUDES: RowId = 3;

pub struct Satellites {
    pub composer: Composer,
    pub recorder: Arc<Recorder>,
}

pub fn satellites_catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    catalog.add_table(
        "satellites",
        &[
            "Perigee_km",
            "Apogee_km",
            "Period_minutes",
            "Class_of_orbit",
            "Longitude_radians",
        ],
    );
    catalog.add_generator(
        COMPOSED,
        "satellites",
        &[
            ("Perigee_km", "numerical"),
            ("Apogee_km", "numerical"),
            ("Period_minutes", "numerical"),
            ("Class_of_orbit", "categorical"),
            ("Longitude_radians", "cyclic"),
        ],
    );
    catalog.add_generator(
        BASE,
        "satellites",
        &[("Perigee_km", "numerical"), ("Apogee_km", "numerical")],
    );

    let n = |x: f64| Some(Value::Number(x));
    catalog
        .insert_row(
            "satellites",
            ROW_COMPLETE,
            vec![
                n(PERIGEE_KM),
                n(APOGEE_KM),
                n(PERIOD_MINUTES),
                Some(Value::from("LEO")),
                n(0.5),
            ],
        )
        .unwrap();
    catalog
        .insert_row(
            "satellites",
            ROW_APOGEE_ONLY,
            vec![None, n(APOGEE_KM), None, None, None],
        )
        .unwrap();
    catalog
        .insert_row(
            "satellites",
            ROW_ALTITUDES,
            vec![n(PERIGEE_KM), n(APOGEE_KM), None, None, None],
        )
        .unwrap();
    catalog
}

pub fn satellites_spec() -> CompositionSpec {
    CompositionSpec::default()
        .with_foreign("Period_minutes", "constant", &["Apogee_km", "Perigee_km"])
        .with_foreign("Class_of_orbit", "constant", &["Period_minutes"])
        .with_foreign("Longitude_radians", "constant", &["Perigee_km"])
}

/// Perigee and apogee local; period, class and longitude foreign.
pub fn satellites(config: ComposerConfig) -> Satellites {
    let recorder = Arc::new(Recorder::default());
    let base = MockBase::new(
        vec![Value::Number(PERIGEE_KM), Value::Number(APOGEE_KM)],
        Arc::clone(&recorder),
    );
    let registry = constant_registry(
        &[
            ("Period_minutes", Value::Number(PERIOD_MINUTES), 1.0),
            ("Class_of_orbit", Value::from("LEO"), CLASS_DENSITY),
            ("Longitude_radians", Value::Number(0.5), 1.0),
        ],
        &recorder,
    );
    let mut composer = Composer::create(
        Arc::new(satellites_catalog()),
        COMPOSED,
        BASE,
        Box::new(base),
        &satellites_spec(),
        registry,
        config,
    )
    .unwrap();
    composer.initialize_models(&[0, 1]).unwrap();
    Satellites { composer, recorder }
}

// ============================================================================
// Twins
// ============================================================================

pub const A: ColNo = 0;
pub const B: ColNo = 1;
pub const F: ColNo = 2;
pub const G: ColNo = 3;

/// Local `a`, `b`; foreign `f | a` and `g | b`. The base reports
/// `dependence` between distinct local columns.
pub fn twins(dependence: f64) -> Composer {
    let recorder = Arc::new(Recorder::default());
    let mut catalog = MemoryCatalog::new();
    catalog.add_table("twins", &["a", "b", "f", "g"]);
    catalog.add_generator(
        COMPOSED,
        "twins",
        &[
            ("a", "numerical"),
            ("b", "numerical"),
            ("f", "numerical"),
            ("g", "numerical"),
        ],
    );
    catalog.add_generator(BASE, "twins", &[("a", "numerical"), ("b", "numerical")]);

    let spec = CompositionSpec::default()
        .with_foreign("f", "constant", &["a"])
        .with_foreign("g", "constant", &["b"]);
    let registry = constant_registry(
        &[("f", Value::Number(1.0), 1.0), ("g", Value::Number(2.0), 1.0)],
        &recorder,
    );
    let base = MockBase::new(vec![Value::Number(0.0), Value::Number(0.0)], recorder)
        .with_dependence(dependence);

    let mut composer = Composer::create(
        Arc::new(catalog),
        COMPOSED,
        BASE,
        Box::new(base),
        &spec,
        registry,
        ComposerConfig::default(),
    )
    .unwrap();
    composer.initialize_models(&[0]).unwrap();
    composer
}

// ============================================================================
// Coins
// ============================================================================

/// Probability that local `b` agrees with local `a` in [`CoinBase`].
pub const AGREEMENT: f64 = 0.8;

/// Probability that a [`NoisyCopy`] reproduces its condition.
pub const FIDELITY: f64 = 0.9;

fn bit(x: bool) -> f64 {
    if x {
        1.0
    } else {
        0.0
    }
}

/// Two fair binary columns; the second agrees with the first with
/// probability [`AGREEMENT`].
pub struct CoinBase;

impl CoinBase {
    fn probability(colno: BaseColNo, x: f64, given: &[(BaseColNo, f64)]) -> f64 {
        if x != 0.0 && x != 1.0 {
            return 0.0;
        }
        match given.iter().find(|(c, _)| c.0 == 1 - colno.0) {
            Some(&(_, other)) if other == x => AGREEMENT,
            Some(_) => 1.0 - AGREEMENT,
            None => 0.5,
        }
    }
}

impl BaseModel for CoinBase {
    fn simulate(
        &self,
        _modelno: Option<ModelNo>,
        constraints: &[(BaseColNo, Value)],
        targets: &[BaseColNo],
        n: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Vec<Value>>> {
        let mut draws = Vec::with_capacity(n);
        for _ in 0..n {
            let mut known: BTreeMap<usize, f64> = constraints
                .iter()
                .filter_map(|(c, v)| v.as_f64().map(|x| (c.0, x)))
                .collect();
            let mut draw = Vec::with_capacity(targets.len());
            for t in targets {
                let x = match (known.get(&t.0), known.get(&(1 - t.0))) {
                    (Some(&x), _) => x,
                    (None, Some(&other)) => {
                        if rng.gen_bool(AGREEMENT) {
                            other
                        } else {
                            1.0 - other
                        }
                    }
                    (None, None) => bit(rng.gen_bool(0.5)),
                };
                known.insert(t.0, x);
                draw.push(Value::Number(x));
            }
            draws.push(draw);
        }
        Ok(draws)
    }

    fn column_value_probability(
        &self,
        _modelno: Option<ModelNo>,
        colno: BaseColNo,
        value: &Value,
        constraints: &[(BaseColNo, Value)],
    ) -> Result<f64> {
        let x = value.expect_number(colno.0)?;
        let given: Vec<(BaseColNo, f64)> = constraints
            .iter()
            .filter_map(|(c, v)| v.as_f64().map(|y| (*c, y)))
            .collect();
        Ok(Self::probability(colno, x, &given))
    }

    fn column_dependence_probability(
        &self,
        _modelno: Option<ModelNo>,
        _colno0: BaseColNo,
        _colno1: BaseColNo,
    ) -> Result<f64> {
        Ok(1.0)
    }

    fn column_mutual_information(
        &self,
        _modelno: Option<ModelNo>,
        _colno0: BaseColNo,
        _colno1: BaseColNo,
        _numsamples: usize,
    ) -> Result<f64> {
        Ok(BASE_MI)
    }

    fn row_similarity(
        &self,
        _modelno: Option<ModelNo>,
        _rowid: RowId,
        _target_rowid: RowId,
        _colnos: &[BaseColNo],
    ) -> Result<f64> {
        Ok(BASE_SIMILARITY)
    }

    fn predict_confidence(
        &self,
        _modelno: Option<ModelNo>,
        _colno: BaseColNo,
        _rowid: RowId,
    ) -> Result<(Value, f64)> {
        Ok((Value::Number(0.0), 0.5))
    }

    fn analyze_models(
        &mut self,
        _modelnos: Option<&[ModelNo]>,
        _options: &AnalyzeOptions,
    ) -> Result<()> {
        Ok(())
    }
}

/// Copies its single binary condition with probability [`FIDELITY`] and
/// flips it otherwise.
pub struct NoisyCopy;

impl NoisyCopy {
    fn source(conditions: &Conditions) -> Result<f64> {
        conditions
            .values()
            .next()
            .and_then(Value::as_f64)
            .ok_or_else(|| composer::ComposerError::MissingConditionValue {
                name: "source".to_string(),
            })
    }
}

impl ForeignPredictor for NoisyCopy {
    fn simulate(
        &self,
        n: usize,
        conditions: &Conditions,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Value>> {
        let x = Self::source(conditions)?;
        Ok((0..n)
            .map(|_| {
                Value::Number(if rng.gen_bool(FIDELITY) { x } else { 1.0 - x })
            })
            .collect())
    }

    fn logpdf(&self, value: &Value, conditions: &Conditions) -> Result<f64> {
        let x = Self::source(conditions)?;
        Ok(match value.as_f64() {
            Some(y) if y == x => FIDELITY.ln(),
            Some(y) if y == 1.0 - x => (1.0 - FIDELITY).ln(),
            _ => f64::NEG_INFINITY,
        })
    }
}

pub const COIN_A: ColNo = 0;
pub const COIN_B: ColNo = 1;
/// Noisy copy of `a`.
pub const COPY_F: ColNo = 2;
/// Noisy copy of `f`.
pub const COPY_G: ColNo = 3;

/// Local `a`, `b` from [`CoinBase`]; foreign `f | a` and `g | f`, both
/// [`NoisyCopy`].
pub fn coins(config: ComposerConfig) -> Composer {
    let mut catalog = MemoryCatalog::new();
    catalog.add_table("coins", &["a", "b", "f", "g"]);
    catalog.add_generator(
        COMPOSED,
        "coins",
        &[
            ("a", "categorical"),
            ("b", "categorical"),
            ("f", "categorical"),
            ("g", "categorical"),
        ],
    );
    catalog.add_generator(BASE, "coins", &[("a", "categorical"), ("b", "categorical")]);

    let spec = CompositionSpec::default()
        .with_foreign("f", "noisy_copy", &["a"])
        .with_foreign("g", "noisy_copy", &["f"]);
    let mut registry = PredictorRegistry::new();
    registry.register("noisy_copy", |_data, _target, _conditions| {
        Ok(Box::new(NoisyCopy) as Box<dyn ForeignPredictor>)
    });

    let mut composer = Composer::create(
        Arc::new(catalog),
        COMPOSED,
        BASE,
        Box::new(CoinBase),
        &spec,
        registry,
        config,
    )
    .unwrap();
    composer.initialize_models(&[0]).unwrap();
    composer
}
