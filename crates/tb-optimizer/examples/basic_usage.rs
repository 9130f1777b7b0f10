use serde::Deserialize;
use tb_optimizer::*;
use tb_types::{ConstructionError, KwArgs};

#[derive(Debug, Deserialize)]
struct Forest {
    n_trees: i64,
    max_features: f64,
    criterion: String,
}

impl Instantiate for Forest {
    fn from_kwargs(kwargs: KwArgs) -> Result<Self, ConstructionError> {
        kwargs.deserialize_into()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Tunebridge Basic Usage Example");

    let schema = serde_json::json!({
        "n_trees": {"distribution": "int", "min": 10, "max": 500, "step": 10},
        "max_features": {"distribution": "float", "min": 0.1, "max": 1.0},
        "criterion": ["gini", "entropy"]
    });

    let creator = InstanceCreator::<Forest>::from_json(&schema)?;
    println!("Parameter space has {} parameters", creator.space().len());

    for number in 0..3 {
        let mut trial = RandomTrial::seeded(number, 42 + number as u64);
        let forest = creator.create(&mut trial)?;
        println!(
            "Trial {}: n_trees={} max_features={:.3} criterion={}",
            number, forest.n_trees, forest.max_features, forest.criterion
        );
    }

    let mut trial = RandomTrial::seeded(0, 7);
    let model = instantiate_lgbm(&mut trial, "regressor", 42)?;
    println!("LightGBM {}: {:?}", model.kind, model.params);

    Ok(())
}
