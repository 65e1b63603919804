//! Module registry: symbolic names to module factories.
//!
//! Configuration files refer to modules by name (`"SAModule"`,
//! `"FPModule"`, ...). The registry resolves a name to a factory for the
//! role the block needs. Built modules are stored as closed enums so the
//! whole U-Net stays a plain `#[derive(Module)]` tree.

use std::collections::HashMap;

use burn::module::Module;
use burn::prelude::*;

use crate::config::{DownConvArgs, InnermostArgs, UpConvArgs};
use crate::data::{PointCloudBatch, UpInput};
use crate::error::{ModuleRole, Result, UnetError};
use crate::interfaces::ConvType;
use crate::nn::{FPModule, GlobalBaseModule, SAModule};

/// A built downsampling module.
#[derive(Module, Debug)]
pub enum DownModule<B: Backend> {
    /// PointNet++ set abstraction.
    SetAbstraction(SAModule<B>),
}

impl<B: Backend> DownModule<B> {
    /// Forward pass.
    pub fn forward(&self, data: PointCloudBatch<B>) -> Result<PointCloudBatch<B>> {
        match self {
            DownModule::SetAbstraction(module) => module.forward(data),
        }
    }

    /// Output feature width.
    pub fn output_dim(&self) -> usize {
        match self {
            DownModule::SetAbstraction(module) => module.output_dim(),
        }
    }
}

/// A built upsampling module.
#[derive(Module, Debug)]
pub enum UpModule<B: Backend> {
    /// PointNet++ feature propagation.
    FeaturePropagation(FPModule<B>),
}

impl<B: Backend> UpModule<B> {
    /// Forward pass.
    pub fn forward(&self, input: UpInput<B>) -> Result<PointCloudBatch<B>> {
        match self {
            UpModule::FeaturePropagation(module) => module.forward(input),
        }
    }

    /// Output feature width.
    pub fn output_dim(&self) -> usize {
        match self {
            UpModule::FeaturePropagation(module) => module.output_dim(),
        }
    }
}

/// A built innermost (global) module.
#[derive(Module, Debug)]
pub enum InnerModule<B: Backend> {
    /// Global pooling.
    GlobalPooling(GlobalBaseModule<B>),
}

impl<B: Backend> InnerModule<B> {
    /// Forward pass.
    pub fn forward(&self, data: PointCloudBatch<B>) -> Result<PointCloudBatch<B>> {
        match self {
            InnerModule::GlobalPooling(module) => module.forward(data),
        }
    }

    /// Output feature width.
    pub fn output_dim(&self) -> usize {
        match self {
            InnerModule::GlobalPooling(module) => module.output_dim(),
        }
    }
}

/// Builds a down module from level arguments.
pub type DownFactory<B> = fn(&DownConvArgs, &<B as Backend>::Device) -> Result<DownModule<B>>;
/// Builds an up module from level arguments.
pub type UpFactory<B> = fn(&UpConvArgs, &<B as Backend>::Device) -> Result<UpModule<B>>;
/// Builds an innermost module from its arguments.
pub type InnerFactory<B> = fn(&InnermostArgs, &<B as Backend>::Device) -> Result<InnerModule<B>>;

/// A registered factory, tagged with the role it fills.
pub enum ModuleFactory<B: Backend> {
    /// Downsampling factory.
    Down(DownFactory<B>),
    /// Upsampling factory.
    Up(UpFactory<B>),
    /// Innermost factory.
    Inner(InnerFactory<B>),
}

impl<B: Backend> ModuleFactory<B> {
    fn role(&self) -> ModuleRole {
        match self {
            ModuleFactory::Down(_) => ModuleRole::Down,
            ModuleFactory::Up(_) => ModuleRole::Up,
            ModuleFactory::Inner(_) => ModuleRole::Innermost,
        }
    }
}

impl<B: Backend> Clone for ModuleFactory<B> {
    fn clone(&self) -> Self {
        match self {
            ModuleFactory::Down(f) => ModuleFactory::Down(*f),
            ModuleFactory::Up(f) => ModuleFactory::Up(*f),
            ModuleFactory::Inner(f) => ModuleFactory::Inner(*f),
        }
    }
}

impl<B: Backend> std::fmt::Debug for ModuleFactory<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModuleFactory::{}", self.role())
    }
}

/// Name to factory table, read-only once the model is built.
#[derive(Debug, Clone)]
pub struct ModuleRegistry<B: Backend> {
    conv_type: ConvType,
    factories: HashMap<String, ModuleFactory<B>>,
}

impl<B: Backend> ModuleRegistry<B> {
    /// Empty registry for modules of the given convolution type.
    pub fn new(conv_type: ConvType) -> Self {
        Self {
            conv_type,
            factories: HashMap::new(),
        }
    }

    /// The PointNet++ modules: `SAModule`, `FPModule`, `GlobalBaseModule`.
    pub fn pointnet2() -> Self {
        Self::new(ConvType::MessagePassing)
            .with("SAModule", ModuleFactory::Down(build_sa))
            .with("FPModule", ModuleFactory::Up(build_fp))
            .with("GlobalBaseModule", ModuleFactory::Inner(build_global))
    }

    /// Register a factory, replacing any previous one under `name`.
    pub fn with(mut self, name: impl Into<String>, factory: ModuleFactory<B>) -> Self {
        self.register(name, factory);
        self
    }

    /// Register a factory, replacing any previous one under `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: ModuleFactory<B>) {
        self.factories.insert(name.into(), factory);
    }

    /// Convolution type of the registered modules.
    pub fn conv_type(&self) -> ConvType {
        self.conv_type
    }

    /// Whether a module is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    fn lookup(&self, name: &str) -> Result<&ModuleFactory<B>> {
        self.factories
            .get(name)
            .ok_or_else(|| UnetError::UnknownModule {
                name: name.to_string(),
            })
    }

    fn unsupported(name: &str, role: ModuleRole) -> UnetError {
        UnetError::Unsupported {
            name: name.to_string(),
            role,
        }
    }

    /// Resolve a down module factory.
    pub fn down(&self, name: &str) -> Result<DownFactory<B>> {
        match self.lookup(name)? {
            ModuleFactory::Down(f) => Ok(*f),
            _ => Err(Self::unsupported(name, ModuleRole::Down)),
        }
    }

    /// Resolve an up module factory.
    pub fn up(&self, name: &str) -> Result<UpFactory<B>> {
        match self.lookup(name)? {
            ModuleFactory::Up(f) => Ok(*f),
            _ => Err(Self::unsupported(name, ModuleRole::Up)),
        }
    }

    /// Resolve an innermost module factory.
    pub fn inner(&self, name: &str) -> Result<InnerFactory<B>> {
        match self.lookup(name)? {
            ModuleFactory::Inner(f) => Ok(*f),
            _ => Err(Self::unsupported(name, ModuleRole::Innermost)),
        }
    }
}

impl<B: Backend> Default for ModuleRegistry<B> {
    fn default() -> Self {
        Self::pointnet2()
    }
}

fn build_sa<B: Backend>(args: &DownConvArgs, device: &B::Device) -> Result<DownModule<B>> {
    Ok(DownModule::SetAbstraction(SAModule::new(args, device)?))
}

fn build_fp<B: Backend>(args: &UpConvArgs, device: &B::Device) -> Result<UpModule<B>> {
    Ok(UpModule::FeaturePropagation(FPModule::new(args, device)?))
}

fn build_global<B: Backend>(args: &InnermostArgs, device: &B::Device) -> Result<InnerModule<B>> {
    Ok(InnerModule::GlobalPooling(GlobalBaseModule::new(args, device)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Aggregation;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_pointnet2_lookup() {
        let registry = ModuleRegistry::<TestBackend>::pointnet2();
        let device = Default::default();

        assert_eq!(registry.conv_type(), ConvType::MessagePassing);
        assert!(registry.contains("SAModule"));

        let build = registry.inner("GlobalBaseModule").unwrap();
        let module = build(
            &InnermostArgs {
                nn: vec![8, 16],
                aggr: Aggregation::Mean,
            },
            &device,
        )
        .unwrap();
        assert_eq!(module.output_dim(), 16);
    }

    #[test]
    fn test_unknown_module() {
        let registry = ModuleRegistry::<TestBackend>::pointnet2();
        let err = registry.down("KPConv").unwrap_err();
        assert!(matches!(err, UnetError::UnknownModule { name } if name == "KPConv"));
    }

    #[test]
    fn test_wrong_role() {
        let registry = ModuleRegistry::<TestBackend>::pointnet2();
        let err = registry.up("SAModule").unwrap_err();
        assert!(matches!(
            err,
            UnetError::Unsupported {
                role: ModuleRole::Up,
                ..
            }
        ));
    }

    #[test]
    fn test_custom_registration() {
        let registry = ModuleRegistry::<TestBackend>::new(ConvType::MessagePassing)
            .with("Upsample", ModuleFactory::Up(build_fp));

        assert!(registry.up("Upsample").is_ok());
        assert!(registry.down("SAModule").is_err());
    }
}
