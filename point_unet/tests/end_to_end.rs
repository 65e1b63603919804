//! End-to-end integration tests.

use burn::backend::{Autodiff, NdArray};
use burn::optim::AdamConfig;
use burn::prelude::*;

use point_unet::prelude::*;

type TestBackend = NdArray;
type TrainBackend = Autodiff<NdArray>;

const PN2_CONFIG: &str = r#"{
    "down_conv": {
        "module_name": "SAModule",
        "ratios": [0.5, 0.25],
        "radius": [0.1, 0.2],
        "max_num_neighbors": 16,
        "down_conv_nn": [[3, 16], [16, 32]]
    },
    "up_conv": {
        "module_name": "FPModule",
        "up_conv_nn": [[96, 64], [80, 32], [35, 32]],
        "up_k": [1, 3, 3]
    },
    "innermost": {
        "module_name": "GlobalBaseModule",
        "nn": [32, 64],
        "aggr": "max"
    }
}"#;

/// Two clouds of 40 and 24 points with 3 features each.
fn two_clouds<B: Backend>(device: &B::Device) -> PointCloudBatch<B> {
    clouds(&[(0, 40), (1, 24)], device)
}

/// Ring-shaped clouds given as `(batch index, size)` with 3 features each.
fn clouds<B: Backend>(layout: &[(i64, usize)], device: &B::Device) -> PointCloudBatch<B> {
    let n: usize = layout.iter().map(|&(_, size)| size).sum();

    let mut pos = Vec::with_capacity(n * 3);
    let mut batch = Vec::with_capacity(n);
    for &(b, size) in layout {
        for i in 0..size {
            let t = i as f32 / size as f32 * std::f32::consts::PI * 2.0;
            pos.extend_from_slice(&[t.cos() * 0.3, t.sin() * 0.3, (i % 4) as f32 * 0.05]);
            batch.push(b);
        }
    }
    let x: Vec<f32> = (0..n * 3).map(|i| (i % 7) as f32 / 7.0).collect();

    PointCloudBatch::new(
        Some(Tensor::from_data(TensorData::new(x, [n, 3]), device)),
        Tensor::from_data(TensorData::new(pos, [n, 3]), device),
        Tensor::from_data(TensorData::new(batch, [n]), device),
    )
}

fn labels<B: Backend>(n: usize, num_classes: usize, device: &B::Device) -> Tensor<B, 1, Int> {
    let values: Vec<i64> = (0..n).map(|i| (i % num_classes) as i64).collect();
    Tensor::from_data(TensorData::new(values, [n]), device)
}

#[test]
fn test_pointnet2_with_global_block() {
    let device = Default::default();
    let config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    let registry = ModuleRegistry::pointnet2();

    let model = UnetBasedModel::<TestBackend>::new(&config, 5, &registry, &device).unwrap();
    assert_eq!(model.num_classes(), 5);
    assert_eq!(model.num_blocks(), 3);

    let data = two_clouds::<TestBackend>(&device);
    let n = data.num_points();
    let batch = data.host_batch().unwrap();

    let out = model.forward(data).unwrap();
    assert_eq!(out.x.as_ref().unwrap().dims(), [n, 5]);
    assert_eq!(out.host_batch().unwrap(), batch);

    let logits: Vec<f32> = out.x.unwrap().to_data().to_vec().unwrap();
    assert!(logits.iter().all(|v| v.is_finite()));
}

#[test]
fn test_nesting_order() {
    let device = Default::default();
    let config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    let model =
        UnetBasedModel::<TestBackend>::new(&config, 5, &ModuleRegistry::pointnet2(), &device)
            .unwrap();

    let [root, level1, innermost] = model.blocks() else {
        panic!("expected 3 blocks, got {}", model.num_blocks());
    };
    assert_eq!(root.kind(), BlockKind::Outermost);
    assert_eq!(root.up().output_dim(), 5);

    assert_eq!(level1.kind(), BlockKind::Intermediate);
    assert_eq!(level1.down().map(|d| d.output_dim()), Some(32));

    assert_eq!(innermost.kind(), BlockKind::Innermost);
    assert_eq!(innermost.inner().map(|m| m.output_dim()), Some(64));
    assert!(innermost.down().is_none());
}

#[test]
fn test_batch_offset_with_global_block() {
    // The only cloud carries batch index 1.
    let device = Default::default();
    let config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    let model =
        UnetBasedModel::<TestBackend>::new(&config, 5, &ModuleRegistry::pointnet2(), &device)
            .unwrap();

    let data = clouds::<TestBackend>(&[(1, 32)], &device);
    let out = model.forward(data).unwrap();
    assert_eq!(out.x.as_ref().unwrap().dims(), [32, 5]);
    assert_eq!(out.host_batch().unwrap(), vec![1; 32]);

    let logits: Vec<f32> = out.x.unwrap().to_data().to_vec().unwrap();
    assert!(logits.iter().all(|v| v.is_finite()));
}

#[test]
fn test_batch_gap_with_global_block() {
    let device = Default::default();
    let config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    let model =
        UnetBasedModel::<TestBackend>::new(&config, 5, &ModuleRegistry::pointnet2(), &device)
            .unwrap();

    let data = clouds::<TestBackend>(&[(0, 40), (2, 24)], &device);
    let batch = data.host_batch().unwrap();
    let out = model.forward(data).unwrap();
    assert_eq!(out.x.as_ref().unwrap().dims(), [64, 5]);
    assert_eq!(out.host_batch().unwrap(), batch);
}

#[test]
fn test_batch_gap_matches_dense_batch() {
    // Renumbering clouds must not change their predictions.
    let device = Default::default();
    let config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    let model =
        UnetBasedModel::<TestBackend>::new(&config, 5, &ModuleRegistry::pointnet2(), &device)
            .unwrap();

    let dense: Vec<f32> = model
        .forward(clouds::<TestBackend>(&[(0, 40), (1, 24)], &device))
        .unwrap()
        .x
        .unwrap()
        .to_data()
        .to_vec()
        .unwrap();
    let gapped: Vec<f32> = model
        .forward(clouds::<TestBackend>(&[(0, 40), (3, 24)], &device))
        .unwrap()
        .x
        .unwrap()
        .to_data()
        .to_vec()
        .unwrap();

    assert_eq!(dense.len(), gapped.len());
    assert!(dense.iter().zip(&gapped).all(|(a, b)| (a - b).abs() < 1e-4));
}

#[test]
fn test_empty_input() {
    let device = Default::default();
    let config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    let model =
        UnetBasedModel::<TestBackend>::new(&config, 5, &ModuleRegistry::pointnet2(), &device)
            .unwrap();

    let err = model.forward(clouds::<TestBackend>(&[], &device)).unwrap_err();
    assert!(matches!(err, UnetError::InvalidInput { .. }));
}

#[test]
fn test_outermost_width_without_global() {
    let device = Default::default();
    let registry = ModuleRegistry::pointnet2();

    for levels in 1..=3usize {
        let nn: Vec<Vec<usize>> = (0..levels)
            .map(|i| if i == 0 { vec![3, 16] } else { vec![16, 16] })
            .collect();
        let mut up_nn = vec![vec![32, 16]; levels];
        up_nn.push(vec![19, 16]);

        let config = UnetConfig::new(
            ModuleOptions::for_module("SAModule")
                .with("ratio", 0.5)
                .with("radius", 0.5)
                .with("down_conv_nn", nn),
            ModuleOptions::for_module("FPModule")
                .with("up_conv_nn", up_nn)
                .with("up_k", 3),
        );

        let model = UnetBasedModel::<TestBackend>::new(&config, 7, &registry, &device).unwrap();
        assert_eq!(model.num_blocks(), levels);

        let data = two_clouds::<TestBackend>(&device);
        let n = data.num_points();
        let out = model.forward(data).unwrap();
        assert_eq!(out.x.unwrap().dims(), [n, 7]);
    }
}

#[test]
fn test_level_count_mismatch() {
    let mut config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    config
        .up_conv
        .insert("up_conv_nn", vec![vec![96, 64], vec![35, 32]]);

    let err = UnetBasedModel::<TestBackend>::new(
        &config,
        5,
        &ModuleRegistry::pointnet2(),
        &Default::default(),
    )
    .unwrap_err();
    assert!(matches!(err, UnetError::LevelCountMismatch { .. }));
}

#[test]
fn test_unknown_inner_module() {
    let mut config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    if let Some(innermost) = config.innermost.as_mut() {
        innermost.insert("module_name", "GlobalAttention");
    }

    let err = UnetBasedModel::<TestBackend>::new(
        &config,
        5,
        &ModuleRegistry::pointnet2(),
        &Default::default(),
    )
    .unwrap_err();
    assert!(matches!(err, UnetError::UnknownModule { name } if name == "GlobalAttention"));
}

#[test]
fn test_wrong_feature_width() {
    let device = Default::default();
    let config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    let model =
        UnetBasedModel::<TestBackend>::new(&config, 5, &ModuleRegistry::pointnet2(), &device)
            .unwrap();

    let mut data = two_clouds::<TestBackend>(&device);
    data.x = data.x.map(|x| x.slice([0..64, 0..2]));

    let err = model.forward(data).unwrap_err();
    assert!(matches!(err, UnetError::ShapeMismatch { .. }));
}

#[test]
fn test_segmentation_training_step() {
    let device = Default::default();
    let config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    let model =
        UnetBasedModel::<TrainBackend>::new(&config, 4, &ModuleRegistry::pointnet2(), &device)
            .unwrap();

    let mut seg = UnetSegmentationModel::<TrainBackend, _>::new(model);
    seg.set_optimizer(AdamConfig::new().init::<TrainBackend, UnetBasedModel<TrainBackend>>());

    let data = two_clouds::<TrainBackend>(&device);
    let n = data.num_points();
    seg.set_input(LabeledBatch::new(data, labels(n, 4, &device)));

    let before: Vec<f32> = seg.forward().unwrap().to_data().to_vec().unwrap();
    let loss = seg.current_losses().unwrap()[LOSS_SEG];
    assert!(loss.is_finite());

    seg.optimize_parameters(1e-2).unwrap();
    let after: Vec<f32> = seg.forward().unwrap().to_data().to_vec().unwrap();

    assert_eq!(before.len(), after.len());
    assert!(before.iter().zip(&after).any(|(a, b)| (a - b).abs() > 1e-6));
}

#[test]
fn test_training_step_needs_labels() {
    let device = Default::default();
    let config = UnetConfig::from_json(PN2_CONFIG).unwrap();
    let model =
        UnetBasedModel::<TrainBackend>::new(&config, 4, &ModuleRegistry::pointnet2(), &device)
            .unwrap();

    let mut seg = UnetSegmentationModel::<TrainBackend, _>::new(model);
    seg.set_optimizer(AdamConfig::new().init::<TrainBackend, UnetBasedModel<TrainBackend>>());
    seg.set_points(two_clouds::<TrainBackend>(&device));

    let err = seg.optimize_parameters(1e-2).unwrap_err();
    assert!(matches!(err, UnetError::InvalidInput { .. }));
}
