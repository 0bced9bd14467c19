//! End-to-end training through `SagModel`.

use approx::assert_abs_diff_eq;
use rstest::rstest;

use sagreg::data::{ClassificationTrainingRow, TrainingData};
use sagreg::model::{ConfigError, SagConfig, SagModel};
use sagreg::testing::synthetic_classification;
use sagreg::training::sag::{LearningRateKind, Prior, TrainError, UpdaterKind};

fn accuracy(model: &SagModel, data: &TrainingData) -> f64 {
    let correct = data
        .rows()
        .iter()
        .filter(|row| model.predict_category(*row) == row.category())
        .count();
    correct as f64 / data.n_rows() as f64
}

#[rstest]
#[case(LearningRateKind::Fixed(0.2))]
#[case(LearningRateKind::Annealing { initial: 0.3, decay: 0.01 })]
#[case(LearningRateKind::LineSearch)]
fn learns_linearly_separable_data(#[case] learning_rate: LearningRateKind) {
    let data = synthetic_classification(200, 5, 3, 0.2, 11);
    let config = SagConfig::builder()
        .max_epochs(100)
        .learning_rate(learning_rate)
        .build()
        .unwrap();

    let model = SagModel::train(&data, &config).unwrap();

    let history = model.loss_history();
    assert!(history.last().unwrap() < &history[0]);
    assert!(*history.last().unwrap() < 3f64.ln());
    let acc = accuracy(&model, &data);
    assert!(acc > 0.75, "training accuracy {acc}");
}

#[test]
fn lazy_and_eager_models_agree() {
    let data = synthetic_classification(150, 30, 4, 0.8, 5);
    let base = SagConfig::builder()
        .max_epochs(40)
        .epsilon(0.0)
        .prior(Prior::gauss(5.0))
        .build()
        .unwrap();
    let eager = SagConfig {
        updater: UpdaterKind::Eager,
        ..base.clone()
    };

    let lazy_model = SagModel::train(&data, &base).unwrap();
    let eager_model = SagModel::train(&data, &eager).unwrap();

    assert_eq!(lazy_model.n_epochs(), 40);
    assert_abs_diff_eq!(
        lazy_model.coefficients(),
        eager_model.coefficients(),
        epsilon = 1e-6
    );
}

#[test]
fn lazy_matches_eager_under_heavy_shrink() {
    let data = synthetic_classification(200, 5, 2, 0.5, 17);
    let lazy = SagConfig::builder()
        .max_epochs(2)
        .epsilon(0.0)
        .learning_rate(LearningRateKind::Fixed(1.0))
        .prior(Prior::gauss(0.00505))
        .build()
        .unwrap();
    let eager = SagConfig {
        updater: UpdaterKind::Eager,
        ..lazy.clone()
    };

    let lazy_model = SagModel::train(&data, &lazy).unwrap();
    let eager_model = SagModel::train(&data, &eager).unwrap();

    assert!(lazy_model.coefficients().iter().all(|w| w.is_finite()));
    assert_abs_diff_eq!(
        lazy_model.coefficients(),
        eager_model.coefficients(),
        epsilon = 1e-6
    );
}

#[test]
fn probabilities_sum_to_one() {
    let data = synthetic_classification(60, 8, 5, 0.5, 21);
    let config = SagConfig::builder().max_epochs(10).build().unwrap();
    let model = SagModel::train(&data, &config).unwrap();

    for row in data.rows() {
        let p = model.predict_proba(row);
        assert_eq!(p.len(), 5);
        assert_abs_diff_eq!(p.sum(), 1.0, epsilon = 1e-9);
        assert!(p.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}

#[test]
fn stronger_prior_gives_smaller_coefficients() {
    let data = synthetic_classification(100, 10, 3, 0.3, 8);
    let train = |variance: f64| {
        let config = SagConfig::builder()
            .max_epochs(50)
            .prior(Prior::gauss(variance))
            .build()
            .unwrap();
        let model = SagModel::train(&data, &config).unwrap();
        let coefficients = model.coefficients();
        coefficients
            .columns()
            .into_iter()
            .skip(1)
            .flat_map(|c| c.to_vec())
            .map(|w| w * w)
            .sum::<f64>()
    };
    assert!(train(0.1) < train(100.0));
}

#[test]
fn multithreaded_training_matches_sequential() {
    let data = synthetic_classification(80, 12, 3, 0.5, 13);
    let sequential = SagConfig::builder().max_epochs(15).build().unwrap();
    let threaded = SagConfig {
        n_threads: 2,
        ..sequential.clone()
    };
    let a = SagModel::train(&data, &sequential).unwrap();
    let b = SagModel::train(&data, &threaded).unwrap();

    assert_eq!(a.coefficients(), b.coefficients());
    for (x, y) in a.loss_history().iter().zip(b.loss_history()) {
        assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
    }
}

#[test]
fn model_survives_json() {
    let data = synthetic_classification(40, 6, 3, 0.4, 2);
    let model = SagModel::train(&data, &SagConfig::builder().max_epochs(5).build().unwrap()).unwrap();

    let mut buf = Vec::new();
    model.write_json_into(&mut buf).unwrap();
    let restored = SagModel::read_json_from(buf.as_slice()).unwrap();

    assert_eq!(restored.n_epochs(), model.n_epochs());
    for row in data.rows() {
        assert_abs_diff_eq!(
            restored.predict_linear(row),
            model.predict_linear(row),
            epsilon = 1e-12
        );
    }
}

#[test]
fn invalid_config_is_rejected() {
    assert_eq!(
        SagConfig::builder().max_epochs(0).build(),
        Err(ConfigError::InvalidMaxEpochs)
    );
    assert!(matches!(
        SagConfig::builder()
            .learning_rate(LearningRateKind::Fixed(f64::INFINITY))
            .build(),
        Err(ConfigError::InvalidLearningRate(_))
    ));
}

#[test]
fn overshooting_shrink_is_a_train_error() {
    let data = synthetic_classification(10, 3, 2, 0.0, 1);
    // λ = 1 / (0.01 · 10) = 10, step 0.5 → shrink factor -4
    let config = SagConfig::builder()
        .learning_rate(LearningRateKind::Fixed(0.5))
        .prior(Prior::gauss(0.01))
        .build()
        .unwrap();
    let err = SagModel::train(&data, &config).unwrap_err();
    assert!(matches!(err, TrainError::InvalidStepSize { iteration: 0, .. }));
}
