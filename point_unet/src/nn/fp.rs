//! Feature propagation (PointNet++ upsampling).

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

use point_core::knn_interpolation_weights;

use crate::config::UpConvArgs;
use crate::data::{host_batch, host_positions, index_tensor, PointCloudBatch, UpInput};
use crate::error::{Result, UnetError};
use crate::nn::mlp::{Mlp, MlpConfig};

/// Upsampling block from PointNet++.
///
/// Interpolates coarse features onto the skip point set from the `k` nearest
/// coarse points (inverse squared distance weights), concatenates the skip
/// features when present, and applies an MLP. The outermost block also
/// carries a linear output projection.
#[derive(Module, Debug)]
pub struct FPModule<B: Backend> {
    nn: Mlp<B>,
    head: Option<Linear<B>>,
    k: usize,
    index: usize,
}

impl<B: Backend> FPModule<B> {
    /// Create a feature propagation block from level arguments.
    pub fn new(args: &UpConvArgs, device: &B::Device) -> Result<Self> {
        if args.up_conv_nn.is_empty() {
            return Err(UnetError::config("up_conv_nn must not be empty"));
        }
        if args.up_k == 0 {
            return Err(UnetError::config("up_k must be at least 1"));
        }

        let nn = MlpConfig::new(args.up_conv_nn.clone()).init(device);
        let head = args
            .output_nc
            .map(|out| LinearConfig::new(nn.output_dim(), out).init(device));

        Ok(Self {
            nn,
            head,
            k: args.up_k,
            index: args.index,
        })
    }

    /// Number of coarse neighbors blended per fine point.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Decoder level of this block.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Output feature width.
    pub fn output_dim(&self) -> usize {
        match &self.head {
            Some(head) => head.weight.val().dims()[1],
            None => self.nn.output_dim(),
        }
    }

    /// Forward pass.
    ///
    /// Returns the new features on the skip positions and batch indices.
    pub fn forward(&self, input: UpInput<B>) -> Result<PointCloudBatch<B>> {
        let UpInput { coarse, skip } = input;
        coarse.validate()?;
        skip.validate()?;

        let x = coarse
            .x
            .ok_or_else(|| UnetError::input("feature propagation needs coarse features"))?;
        let device = x.device();

        let weights = knn_interpolation_weights(
            &host_positions(&coarse.pos)?,
            &host_batch(&coarse.batch)?,
            &skip.host_positions()?,
            &skip.host_batch()?,
            self.k,
        )?;

        let m = weights.num_targets();
        let c = x.dims()[1];
        let gathered: Tensor<B, 3> = x
            .select(0, index_tensor::<B>(&weights.indices, &device))
            .reshape([m, self.k, c]);
        let w: Tensor<B, 3> =
            Tensor::from_data(TensorData::new(weights.weights, [m, self.k, 1]), &device);
        let interpolated: Tensor<B, 2> = (gathered * w).sum_dim(1).reshape([m, c]);

        let x = match skip.x {
            Some(x_skip) => Tensor::cat(vec![interpolated, x_skip], 1),
            None => interpolated,
        };

        let width = x.dims()[1];
        if width != self.nn.input_dim() {
            return Err(UnetError::ShapeMismatch {
                context: "feature propagation input",
                expected: vec![m, self.nn.input_dim()],
                got: vec![m, width],
            });
        }

        let mut x = self.nn.forward(x);
        if let Some(head) = &self.head {
            x = head.forward(x);
        }

        Ok(PointCloudBatch::new(Some(x), skip.pos, skip.batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use point_core::Point3;

    type TestBackend = NdArray;

    fn cloud(points: &[Point3], features: Option<(Vec<f32>, usize)>) -> PointCloudBatch<TestBackend> {
        let device = Default::default();
        let data = features.as_ref().map(|(v, d)| (v.as_slice(), *d));
        PointCloudBatch::from_points(points, data, &device).unwrap()
    }

    fn up_args(k: usize, nn: Vec<usize>) -> UpConvArgs {
        UpConvArgs {
            index: 0,
            up_k: k,
            up_conv_nn: nn,
            output_nc: None,
        }
    }

    fn coarse() -> PointCloudBatch<TestBackend> {
        cloud(
            &[Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
            Some((vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 3)),
        )
    }

    fn fine(with_features: bool) -> PointCloudBatch<TestBackend> {
        let points: Vec<Point3> = (0..5).map(|i| Point3::new(i as f32 * 0.25, 0.0, 0.0)).collect();
        let features = with_features.then(|| (vec![0.5; 10], 2));
        cloud(&points, features)
    }

    #[test]
    fn test_without_skip_features() {
        let device = Default::default();
        let fp = FPModule::<TestBackend>::new(&up_args(2, vec![3, 8]), &device).unwrap();

        let out = fp.forward(UpInput::new(coarse(), fine(false))).unwrap();
        assert_eq!(out.num_points(), 5);
        assert_eq!(out.feature_dim(), 8);
        assert_eq!(out.feature_dim(), fp.output_dim());
    }

    #[test]
    fn test_with_skip_features_concatenates() {
        let device = Default::default();
        // 3 interpolated + 2 skip channels
        let fp = FPModule::<TestBackend>::new(&up_args(2, vec![5, 8]), &device).unwrap();

        let out = fp.forward(UpInput::new(coarse(), fine(true))).unwrap();
        assert_eq!(out.feature_dim(), 8);

        let narrow = FPModule::<TestBackend>::new(&up_args(2, vec![3, 8]), &device).unwrap();
        let err = narrow.forward(UpInput::new(coarse(), fine(true))).unwrap_err();
        assert!(matches!(
            err,
            UnetError::ShapeMismatch { got, .. } if got == vec![5, 5]
        ));
    }

    #[test]
    fn test_output_keeps_skip_positions() {
        let device = Default::default();
        let fp = FPModule::<TestBackend>::new(&up_args(1, vec![3, 4]), &device).unwrap();

        let skip = fine(false);
        let expected = skip.host_positions().unwrap();
        let out = fp.forward(UpInput::new(coarse(), skip)).unwrap();
        assert_eq!(out.host_positions().unwrap(), expected);
    }

    #[test]
    fn test_head_sets_output_width() {
        let device = Default::default();
        let fp = FPModule::<TestBackend>::new(&up_args(2, vec![3, 8]).with_output_nc(13), &device).unwrap();

        let out = fp.forward(UpInput::new(coarse(), fine(false))).unwrap();
        assert_eq!(out.feature_dim(), 13);
        assert_eq!(fp.output_dim(), 13);
    }

    #[test]
    fn test_interpolation_values() {
        // An identity-width MLP with no stages exposes the raw interpolation.
        let device = Default::default();
        let fp = FPModule::<TestBackend>::new(&up_args(2, vec![3]), &device).unwrap();

        let out = fp.forward(UpInput::new(coarse(), fine(false))).unwrap();
        let values: Vec<f32> = out.x.unwrap().to_data().to_vec().unwrap();

        // first fine point coincides with the first coarse point
        assert!((values[0] - 1.0).abs() < 1e-5);
        assert!(values[1].abs() < 1e-5);
        // midpoint gets an even blend
        assert!((values[6] - 0.5).abs() < 1e-5);
        assert!((values[7] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_requires_coarse_features() {
        let device = Default::default();
        let fp = FPModule::<TestBackend>::new(&up_args(2, vec![3, 8]), &device).unwrap();

        let err = fp.forward(UpInput::new(fine(false), fine(false))).unwrap_err();
        assert!(matches!(err, UnetError::InvalidInput { .. }));
    }

    #[test]
    fn test_rejects_empty_channels() {
        let err = FPModule::<TestBackend>::new(&up_args(2, vec![]), &Default::default()).unwrap_err();
        assert!(matches!(err, UnetError::InvalidConfig { .. }));
    }

    #[test]
    fn test_rejects_empty_skip() {
        let device = Default::default();
        let fp = FPModule::<TestBackend>::new(&up_args(2, vec![3, 8]), &device).unwrap();

        let err = fp.forward(UpInput::new(coarse(), cloud(&[], None))).unwrap_err();
        assert!(matches!(err, UnetError::InvalidInput { .. }));
    }
}
