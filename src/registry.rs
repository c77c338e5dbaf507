// [[file:../mace.note::*header][header:1]]
//! Named potential implementations and their registration into a host.
//!
//! # Usage
//!
//! ```ignore
//! use gosh_mace::*;
//!
//! let registry = PotentialRegistry::mace(Arc::new(loader));
//! let potential = registry.create("mace-off23-small", None)?;
//! potential.add_forces(&topology, &mut system, &AdapterOptions::default())?;
//! ```
// header:1 ends here

// [[file:../mace.note::*imports][imports:1]]
use crate::adapter::{AdapterOptions, EnergyEvaluator, PotentialAdapter, Topology};
use crate::artifact::PipelineArtifact;
use crate::core::*;
use crate::error::PotentialError;
use crate::model::GraphModel;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
// imports:1 ends here

// [[file:../mace.note::5e07c9a2][5e07c9a2]]
const FOUNDATION_PREFIX: &str = "mace-off23-";

/// Sizes of the pretrained foundation models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoundationSize {
    Small,
    Medium,
    Large,
}

impl FromStr for FoundationSize {
    type Err = PotentialError;

    fn from_str(s: &str) -> std::result::Result<Self, PotentialError> {
        match s {
            "small" => Ok(FoundationSize::Small),
            "medium" => Ok(FoundationSize::Medium),
            "large" => Ok(FoundationSize::Large),
            _ => Err(PotentialError::UnsupportedModel {
                name: format!("{}{}", FOUNDATION_PREFIX, s),
            }),
        }
    }
}

impl fmt::Display for FoundationSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            FoundationSize::Small => "small",
            FoundationSize::Medium => "medium",
            FoundationSize::Large => "large",
        };
        write!(f, "{}", s)
    }
}

/// Where a model comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    /// A pretrained foundation model.
    Foundation(FoundationSize),
    /// A locally trained model file.
    File(PathBuf),
}

impl ModelSource {
    /// Resolve the source of model `name`; `mace` needs `model_path`.
    pub fn resolve(name: &str, model_path: Option<&Path>) -> Result<Self> {
        if let Some(size) = name.strip_prefix(FOUNDATION_PREFIX) {
            Ok(ModelSource::Foundation(size.parse()?))
        } else if name == "mace" {
            match model_path {
                Some(path) => Ok(ModelSource::File(path.to_owned())),
                None => Err(PotentialError::MissingModelSource { name: name.into() }.into()),
            }
        } else {
            Err(PotentialError::UnsupportedModel { name: name.into() }.into())
        }
    }
}

/// Loads a model from its source. Deserializing model weights is left to the
/// implementor.
pub trait ModelLoader {
    fn load(&self, source: &ModelSource) -> Result<Box<dyn GraphModel>>;
}

impl<F> ModelLoader for F
where
    F: Fn(&ModelSource) -> Result<Box<dyn GraphModel>>,
{
    fn load(&self, source: &ModelSource) -> Result<Box<dyn GraphModel>> {
        self(source)
    }
}
// 5e07c9a2 ends here

// [[file:../mace.note::9b3c7d15][9b3c7d15]]
/// A force backed by an external model, as registered into a host.
pub struct ExternalModelForce {
    /// The pipeline artifact the host can reload the force from.
    pub filename: PathBuf,
    pub force_group: usize,
    pub uses_periodic_boundary_conditions: bool,
    pub evaluator: Box<dyn EnergyEvaluator>,
}

/// The host simulation system forces are added to.
pub trait HostSystem {
    fn uses_periodic_boundary_conditions(&self) -> bool;

    /// Add `force` and return its index in the host.
    fn add_force(&mut self, force: ExternalModelForce) -> usize;
}

/// A named potential that can add itself to a host system.
pub trait PotentialImpl {
    fn add_forces(&self, topology: &Topology, system: &mut dyn HostSystem, options: &AdapterOptions) -> Result<()>;
}

/// Creates `PotentialImpl` objects for registered names.
pub trait PotentialImplFactory {
    fn create_impl(&self, name: &str, model_path: Option<&Path>) -> Result<Box<dyn PotentialImpl>>;
}
// 9b3c7d15 ends here

// [[file:../mace.note::f2a84e60][f2a84e60]]
/// MACE potentials: the foundation models and locally trained ones.
pub struct MacePotentialImpl {
    name: String,
    model_path: Option<PathBuf>,
    loader: Arc<dyn ModelLoader>,
}

impl MacePotentialImpl {
    pub fn new(name: &str, model_path: Option<&Path>, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            name: name.into(),
            model_path: model_path.map(|p| p.to_owned()),
            loader,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_source(&self) -> Result<ModelSource> {
        ModelSource::resolve(&self.name, self.model_path.as_deref())
    }

    /// Load the model and bind it to `topology`.
    pub fn create_adapter(&self, topology: &Topology, options: &AdapterOptions) -> Result<PotentialAdapter> {
        // reject bad options before loading anything
        options.energy_kind()?;
        let source = self.model_source()?;
        let model = self
            .loader
            .load(&source)
            .with_context(|| format!("load model {} from {:?}", self.name, source))?;

        PotentialAdapter::new(model, topology, options)
    }
}

impl PotentialImpl for MacePotentialImpl {
    fn add_forces(&self, topology: &Topology, system: &mut dyn HostSystem, options: &AdapterOptions) -> Result<()> {
        let mut topology = topology.clone();
        topology.uses_periodic_boundary_conditions |= system.uses_periodic_boundary_conditions();

        let adapter = self.create_adapter(&topology, options)?;
        let source = self.model_source()?;
        let artifact = PipelineArtifact::describe(&self.name, source, &adapter, &topology, options.force_group);
        artifact.save(&options.filename)?;

        let periodic = adapter.is_periodic();
        let index = system.add_force(ExternalModelForce {
            filename: options.filename.clone(),
            force_group: options.force_group,
            uses_periodic_boundary_conditions: periodic,
            evaluator: Box::new(adapter),
        });
        info!("{} force added as #{} in group {}", self.name, index, options.force_group);

        Ok(())
    }
}

pub struct MacePotentialImplFactory {
    loader: Arc<dyn ModelLoader>,
}

impl MacePotentialImplFactory {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self { loader }
    }
}

impl PotentialImplFactory for MacePotentialImplFactory {
    fn create_impl(&self, name: &str, model_path: Option<&Path>) -> Result<Box<dyn PotentialImpl>> {
        Ok(Box::new(MacePotentialImpl::new(name, model_path, self.loader.clone())))
    }
}
// f2a84e60 ends here

// [[file:../mace.note::40d6b2f9][40d6b2f9]]
/// Maps potential names to factories. Owned by the application; there is no
/// process-wide registry.
#[derive(Default)]
pub struct PotentialRegistry {
    factories: BTreeMap<String, Box<dyn PotentialImplFactory>>,
}

impl PotentialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the MACE model names.
    pub fn mace(loader: Arc<dyn ModelLoader>) -> Self {
        let mut registry = Self::new();
        for name in &["mace", "mace-off23-small", "mace-off23-medium", "mace-off23-large"] {
            registry.register(name, Box::new(MacePotentialImplFactory::new(loader.clone())));
        }
        registry
    }

    /// Register `factory` under `name`, replacing any previous one.
    pub fn register(&mut self, name: &str, factory: Box<dyn PotentialImplFactory>) {
        if self.factories.insert(name.into(), factory).is_some() {
            debug!("replaced potential factory {}", name);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }

    pub fn create(&self, name: &str, model_path: Option<&Path>) -> Result<Box<dyn PotentialImpl>> {
        match self.factories.get(name) {
            Some(factory) => factory.create_impl(name, model_path),
            None => Err(PotentialError::UnsupportedModel { name: name.into() }.into()),
        }
    }
}
// 40d6b2f9 ends here

// [[file:../mace.note::*test][test:1]]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::lj::LennardJones;

    #[derive(Default)]
    struct TestSystem {
        periodic: bool,
        forces: Vec<ExternalModelForce>,
    }

    impl HostSystem for TestSystem {
        fn uses_periodic_boundary_conditions(&self) -> bool {
            self.periodic
        }

        fn add_force(&mut self, force: ExternalModelForce) -> usize {
            self.forces.push(force);
            self.forces.len() - 1
        }
    }

    fn lj_loader() -> Arc<dyn ModelLoader> {
        let loader = |source: &ModelSource| -> Result<Box<dyn GraphModel>> {
            match source {
                ModelSource::File(path) if !path.ends_with("lj.model") => bail!("no such model: {:?}", path),
                _ => Ok(Box::new(LennardJones::default())),
            }
        };
        Arc::new(loader)
    }

    fn kind_of(err: &Error) -> Option<&PotentialError> {
        err.downcast_ref::<PotentialError>()
    }

    #[test]
    fn test_model_source() -> Result<()> {
        assert_eq!(
            ModelSource::resolve("mace-off23-medium", None)?,
            ModelSource::Foundation(FoundationSize::Medium)
        );
        assert_eq!(
            ModelSource::resolve("mace", Some("a.model".as_ref()))?,
            ModelSource::File("a.model".into())
        );

        let err = ModelSource::resolve("mace", None).unwrap_err();
        assert!(matches!(kind_of(&err), Some(PotentialError::MissingModelSource { .. })));
        let err = ModelSource::resolve("mace-off23-huge", None).unwrap_err();
        assert!(matches!(kind_of(&err), Some(PotentialError::UnsupportedModel { .. })));

        Ok(())
    }

    #[test]
    fn test_registry_add_forces() -> Result<()> {
        let registry = PotentialRegistry::mace(lj_loader());
        assert_eq!(registry.names().count(), 4);
        let err = registry.create("ani2x", None).err().unwrap();
        assert!(matches!(kind_of(&err), Some(PotentialError::UnsupportedModel { .. })));

        let dir = tempfile::tempdir()?;
        let options = AdapterOptions {
            force_group: 2,
            filename: dir.path().join("model.json"),
            ..Default::default()
        };
        let topology = Topology::new(vec![8, 1, 1]);
        let mut system = TestSystem {
            periodic: true,
            ..Default::default()
        };
        let potential = registry.create("mace", Some("models/lj.model".as_ref()))?;
        potential.add_forces(&topology, &mut system, &options)?;

        assert_eq!(system.forces.len(), 1);
        let force = &system.forces[0];
        assert_eq!(force.force_group, 2);
        assert!(force.uses_periodic_boundary_conditions);
        assert!(force.filename.exists());

        let positions = [[0.0, 0.0, 0.0], [0.096, 0.0, 0.0], [-0.024, 0.093, 0.0]];
        let e = force.evaluator.forward(&positions, Some([[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]))?;
        assert!(e.is_finite());

        Ok(())
    }

    #[test]
    fn test_registry_errors() -> Result<()> {
        let registry = PotentialRegistry::mace(lj_loader());
        let topology = Topology::new(vec![8, 1, 1]);
        let mut system = TestSystem::default();
        let dir = tempfile::tempdir()?;
        let options = AdapterOptions {
            filename: dir.path().join("model.json"),
            ..Default::default()
        };

        let potential = registry.create("mace", None)?;
        let err = potential.add_forces(&topology, &mut system, &options).unwrap_err();
        assert!(matches!(kind_of(&err), Some(PotentialError::MissingModelSource { .. })));

        let potential = registry.create("mace", Some("missing.model".as_ref()))?;
        assert!(potential.add_forces(&topology, &mut system, &options).is_err());

        let potential = registry.create("mace-off23-small", None)?;
        let options = AdapterOptions {
            return_energy_type: "total".into(),
            ..options
        };
        let err = potential.add_forces(&topology, &mut system, &options).unwrap_err();
        assert!(matches!(kind_of(&err), Some(PotentialError::UnsupportedEnergyKind { .. })));

        assert!(system.forces.is_empty());
        assert!(!options.filename.exists());

        Ok(())
    }
}
// test:1 ends here
