//! Per-point segmentation on top of [`UnetBasedModel`].

use std::collections::BTreeMap;

use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::data::{host_scalar, LabeledBatch, PointCloudBatch};
use crate::error::{Result, UnetError};
use crate::interfaces::{CheckpointInterface, TrackerInterface};
use crate::model::unet::UnetBasedModel;

/// Name of the segmentation loss in [`TrackerInterface::current_losses`].
pub const LOSS_SEG: &str = "loss_seg";

/// Segmentation model: a U-Net, its last forward pass, and the optimizer
/// state a checkpointer persists.
///
/// `O` is the optimizer and `S` the scheduler type; both default to `()`
/// for inference-only use.
pub struct UnetSegmentationModel<B: Backend, O = (), S = ()> {
    model: UnetBasedModel<B>,
    optimizer: Option<O>,
    schedulers: BTreeMap<String, S>,
    input: Option<PointCloudBatch<B>>,
    labels: Option<Tensor<B, 1, Int>>,
    output: Option<Tensor<B, 2>>,
    loss_seg: Option<Tensor<B, 1>>,
}

impl<B: Backend, O, S> UnetSegmentationModel<B, O, S> {
    /// Wrap a built model.
    pub fn new(model: UnetBasedModel<B>) -> Self {
        Self {
            model,
            optimizer: None,
            schedulers: BTreeMap::new(),
            input: None,
            labels: None,
            output: None,
            loss_seg: None,
        }
    }

    /// The wrapped model.
    pub fn model(&self) -> &UnetBasedModel<B> {
        &self.model
    }

    /// Unwrap the model.
    pub fn into_model(self) -> UnetBasedModel<B> {
        self.model
    }

    /// Set a labeled batch as the next input.
    ///
    /// Tracked results of the previous forward pass are discarded.
    pub fn set_input(&mut self, batch: LabeledBatch<B>) {
        self.clear_results();
        self.input = Some(batch.data);
        self.labels = Some(batch.labels);
    }

    /// Set an unlabeled batch as the next input; no loss is computed for it.
    pub fn set_points(&mut self, data: PointCloudBatch<B>) {
        self.clear_results();
        self.input = Some(data);
        self.labels = None;
    }

    fn clear_results(&mut self) {
        self.output = None;
        self.loss_seg = None;
    }

    /// Run the model on the current input.
    ///
    /// Stores the output and, for labeled input, the cross-entropy loss.
    /// On error nothing is tracked until the next successful pass.
    ///
    /// # Returns
    /// Per-point logits: [N, num_classes]
    pub fn forward(&mut self) -> Result<Tensor<B, 2>> {
        self.clear_results();
        let data = self
            .input
            .clone()
            .ok_or_else(|| UnetError::input("no input set"))?;

        let output = self
            .model
            .forward(data)?
            .x
            .ok_or_else(|| UnetError::input("model produced no features"))?;

        let loss_seg = match &self.labels {
            Some(labels) => {
                let [n, _] = output.dims();
                let [nl] = labels.dims();
                if nl != n {
                    return Err(UnetError::ShapeMismatch {
                        context: "labels",
                        expected: vec![n],
                        got: vec![nl],
                    });
                }

                let loss = CrossEntropyLossConfig::new()
                    .init(&output.device())
                    .forward(output.clone(), labels.clone());
                log::debug!("{}: {:.6}", LOSS_SEG, host_scalar(&loss)?);
                Some(loss)
            }
            None => None,
        };

        self.loss_seg = loss_seg;
        self.output = Some(output.clone());
        Ok(output)
    }

    fn last_output(&self) -> Result<&Tensor<B, 2>> {
        self.output.as_ref().ok_or(UnetError::NoForwardPass)
    }
}

impl<B, O, S> UnetSegmentationModel<B, O, S>
where
    B: AutodiffBackend,
    UnetBasedModel<B>: AutodiffModule<B>,
    O: Optimizer<UnetBasedModel<B>, B>,
{
    /// Forward, backward and one optimizer step at learning rate `lr`.
    ///
    /// Needs labeled input and an attached optimizer.
    pub fn optimize_parameters(&mut self, lr: f64) -> Result<()> {
        self.forward()?;

        let loss = self
            .loss_seg
            .clone()
            .ok_or_else(|| UnetError::input("optimizing needs labeled input"))?;
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or_else(|| UnetError::config("no optimizer attached"))?;

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = optimizer.step(lr, self.model.clone(), grads);
        Ok(())
    }
}

impl<B: Backend, O, S> TrackerInterface<B> for UnetSegmentationModel<B, O, S> {
    fn labels(&self) -> Result<Tensor<B, 1, Int>> {
        self.last_output()?;
        self.labels
            .clone()
            .ok_or_else(|| UnetError::input("last input had no labels"))
    }

    fn batch_idx(&self) -> Result<Tensor<B, 1, Int>> {
        self.input().map(|data| data.batch)
    }

    fn output(&self) -> Result<Tensor<B, 2>> {
        self.last_output().cloned()
    }

    fn input(&self) -> Result<PointCloudBatch<B>> {
        self.last_output()?;
        self.input.clone().ok_or(UnetError::NoForwardPass)
    }

    fn current_losses(&self) -> Result<BTreeMap<String, f32>> {
        self.last_output()?;
        let mut losses = BTreeMap::new();
        if let Some(loss) = &self.loss_seg {
            losses.insert(LOSS_SEG.to_string(), host_scalar(loss)?);
        }
        Ok(losses)
    }
}

impl<B: Backend, O, S> CheckpointInterface for UnetSegmentationModel<B, O, S> {
    type Optimizer = O;
    type Scheduler = S;

    fn optimizer(&self) -> Option<&O> {
        self.optimizer.as_ref()
    }

    fn set_optimizer(&mut self, optimizer: O) {
        self.optimizer = Some(optimizer);
    }

    fn schedulers(&self) -> &BTreeMap<String, S> {
        &self.schedulers
    }

    fn set_schedulers(&mut self, schedulers: BTreeMap<String, S>) {
        self.schedulers = schedulers;
    }
}
