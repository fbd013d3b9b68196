//! Satellites: Kepler's law composed with a base model
//!
//! Run with: cargo run -p composer --example satellites
//!
//! This example demonstrates:
//! - Declaring a foreign column and its conditions
//! - Training built-in predictors from an in-memory catalog
//! - Simulating, scoring and imputing through the composed model
//!
//! The base model here is deliberately naive (independent Gaussians per
//! column); the orbital period is supplied by physics instead.

use std::sync::Arc;

use composer::predictors::{period_minutes, KEPLERS_LAW};
use composer::{
    AnalyzeOptions, BaseColNo, BaseModel, Catalog, Composer, ComposerConfig, ComposerError,
    CompositionSpec, GeneratorId, MemoryCatalog, ModelNo, PredictorRegistry, Result, RowId, Value,
};
use composer_prob::GaussianDist;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

const SATELLITES: GeneratorId = GeneratorId(1);
const ALTITUDES: GeneratorId = GeneratorId(2);

/// One independent Gaussian per base column.
struct IndependentGaussians {
    columns: Vec<GaussianDist>,
}

impl IndependentGaussians {
    fn fit(catalog: &dyn Catalog, generator: GeneratorId) -> Result<Self> {
        let table = catalog.generator_table(generator)?;
        let mut columns = Vec::new();
        for colno in catalog.column_numbers(generator)? {
            let name = catalog.column_name(generator, colno)?;
            let xs: Vec<f64> = catalog
                .fetch_table(&table, &[name])?
                .into_iter()
                .filter_map(|row| row.into_iter().next().flatten())
                .filter_map(|v| v.as_f64())
                .collect();
            columns.push(GaussianDist::fit(&xs)?);
        }
        Ok(Self { columns })
    }

    fn column(&self, colno: BaseColNo) -> Result<&GaussianDist> {
        self.columns
            .get(colno.0)
            .ok_or(ComposerError::UnknownColumn { colno: colno.0 })
    }
}

impl BaseModel for IndependentGaussians {
    fn simulate(
        &self,
        _modelno: Option<ModelNo>,
        constraints: &[(BaseColNo, Value)],
        targets: &[BaseColNo],
        n: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Vec<Value>>> {
        (0..n)
            .map(|_| {
                targets
                    .iter()
                    .map(|&t| match constraints.iter().find(|(c, _)| *c == t) {
                        Some((_, v)) => Ok(v.clone()),
                        None => Ok(Value::Number(self.column(t)?.sample(&mut *rng))),
                    })
                    .collect::<Result<Vec<Value>>>()
            })
            .collect()
    }

    fn column_value_probability(
        &self,
        _modelno: Option<ModelNo>,
        colno: BaseColNo,
        value: &Value,
        _constraints: &[(BaseColNo, Value)],
    ) -> Result<f64> {
        let x = value.expect_number(colno.0)?;
        Ok(self.column(colno)?.log_pdf(x).exp())
    }

    fn column_dependence_probability(
        &self,
        _modelno: Option<ModelNo>,
        colno0: BaseColNo,
        colno1: BaseColNo,
    ) -> Result<f64> {
        Ok(if colno0 == colno1 { 1.0 } else { 0.0 })
    }

    fn column_mutual_information(
        &self,
        _modelno: Option<ModelNo>,
        _colno0: BaseColNo,
        _colno1: BaseColNo,
        _numsamples: usize,
    ) -> Result<f64> {
        Ok(0.0)
    }

    fn row_similarity(
        &self,
        _modelno: Option<ModelNo>,
        _rowid: RowId,
        _target_rowid: RowId,
        _colnos: &[BaseColNo],
    ) -> Result<f64> {
        Err(ComposerError::unsupported("row_similarity"))
    }

    fn predict_confidence(
        &self,
        _modelno: Option<ModelNo>,
        colno: BaseColNo,
        _rowid: RowId,
    ) -> Result<(Value, f64)> {
        Ok((Value::Number(self.column(colno)?.mean), 0.5))
    }

    fn analyze_models(
        &mut self,
        _modelnos: Option<&[ModelNo]>,
        _options: &AnalyzeOptions,
    ) -> Result<()> {
        Ok(())
    }
}

fn catalog() -> Result<MemoryCatalog> {
    let mut catalog = MemoryCatalog::new();
    catalog.add_table("satellites", &["Perigee_km", "Apogee_km", "Period_minutes"]);
    catalog.add_generator(
        SATELLITES,
        "satellites",
        &[
            ("Perigee_km", "numerical"),
            ("Apogee_km", "numerical"),
            ("Period_minutes", "numerical"),
        ],
    );
    catalog.add_generator(
        ALTITUDES,
        "satellites",
        &[("Perigee_km", "numerical"), ("Apogee_km", "numerical")],
    );

    let orbits = [
        (540.0, 560.0),
        (780.0, 800.0),
        (1_400.0, 1_420.0),
        (19_100.0, 19_200.0),
        (20_150.0, 20_200.0),
        (35_770.0, 35_800.0),
        (35_780.0, 35_790.0),
    ];
    for (i, (perigee, apogee)) in orbits.into_iter().enumerate() {
        let period = period_minutes(apogee, perigee) + 0.3 * (i as f64 - 3.0);
        catalog.insert_row(
            "satellites",
            i as RowId + 1,
            vec![
                Some(Value::Number(perigee)),
                Some(Value::Number(apogee)),
                Some(Value::Number(period)),
            ],
        )?;
    }
    // A satellite with a missing period.
    catalog.insert_row(
        "satellites",
        100,
        vec![Some(Value::Number(700.0)), Some(Value::Number(720.0)), None],
    )?;
    Ok(catalog)
}

fn main() -> Result<()> {
    println!("=== Satellites: Kepler's law composed with a base model ===\n");

    let catalog = catalog()?;
    let base = IndependentGaussians::fit(&catalog, ALTITUDES)?;

    // -------------------------------------------------------------------------
    // 1. Composition
    // -------------------------------------------------------------------------
    println!("1. Composition");
    println!("--------------");
    let spec = CompositionSpec::default().with_foreign(
        "Period_minutes",
        KEPLERS_LAW,
        &["Apogee_km", "Perigee_km"],
    );
    let mut composer = Composer::create(
        Arc::new(catalog),
        SATELLITES,
        ALTITUDES,
        Box::new(base),
        &spec,
        PredictorRegistry::with_builtins(),
        ComposerConfig::default(),
    )?;
    composer.initialize_models(&[0])?;
    for column in composer.columns().foreign() {
        println!("  foreign: {} ({})", column.name, column.declared_stattype);
    }
    for column in composer.columns().local() {
        println!("  local:   {} ({})", column.name, column.declared_stattype);
    }
    println!();

    let mut rng = StdRng::seed_from_u64(2024);

    // -------------------------------------------------------------------------
    // 2. Simulation
    // -------------------------------------------------------------------------
    println!("2. Simulating the period of a 1000 km circular orbit");
    println!("----------------------------------------------------");
    let constraints = [(0, Value::Number(1_000.0)), (1, Value::Number(1_000.0))];
    let draws = composer.simulate(None, &constraints, &[2], 5, &mut rng)?;
    for draw in &draws {
        println!("  {}", draw[0]);
    }
    println!("  Kepler: {:.3}", period_minutes(1_000.0, 1_000.0));
    println!();

    // -------------------------------------------------------------------------
    // 3. Density and dependence
    // -------------------------------------------------------------------------
    println!("3. Density and dependence");
    println!("-------------------------");
    let at_law = Value::Number(period_minutes(1_000.0, 1_000.0));
    let off_law = Value::Number(period_minutes(1_000.0, 1_000.0) + 5.0);
    let p_at = composer.column_value_probability(None, 2, &at_law, &constraints, &mut rng)?;
    let p_off = composer.column_value_probability(None, 2, &off_law, &constraints, &mut rng)?;
    println!("  p(period = law)     = {p_at:.4}");
    println!("  p(period = law + 5) = {p_off:.6}");
    println!(
        "  dependence(period, apogee)  = {}",
        composer.column_dependence_probability(None, 2, 1)?
    );
    println!(
        "  dependence(perigee, apogee) = {}",
        composer.column_dependence_probability(None, 0, 1)?
    );
    println!();

    // -------------------------------------------------------------------------
    // 4. Imputation
    // -------------------------------------------------------------------------
    println!("4. Imputing the missing period of row 100");
    println!("-----------------------------------------");
    let (value, confidence) = composer.predict_confidence(None, 2, 100, None, &mut rng)?;
    println!("  period = {value} (confidence {confidence:.3})");
    println!("  Kepler: {:.3}", period_minutes(720.0, 700.0));

    Ok(())
}
