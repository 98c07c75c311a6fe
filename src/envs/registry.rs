//! Global environment registry
use super::{make, BuildEnvError, EnvContext, EnvCreator, Environment};
use log::debug;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

static ENV_REGISTRY: Lazy<RwLock<HashMap<String, EnvCreator>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register an environment constructor under a name, replacing any previous entry.
pub fn register_env<F>(name: impl Into<String>, creator: F)
where
    F: Fn(&EnvContext) -> Result<Box<dyn Environment>, BuildEnvError> + Send + Sync + 'static,
{
    register_creator(name.into(), Arc::new(creator));
}

fn register_creator(name: String, creator: EnvCreator) {
    debug!("registering environment {}", name);
    ENV_REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(name, creator);
}

/// Whether an environment constructor is registered under this name.
pub fn is_registered(name: &str) -> bool {
    ENV_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .contains_key(name)
}

/// The environment constructor registered under this name.
pub fn lookup_env(name: &str) -> Option<EnvCreator> {
    ENV_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(name)
        .cloned()
}

/// An environment type that can be constructed by name.
pub trait NamedEnv: Environment + Sized + 'static {
    /// Registry name of the environment.
    const NAME: &'static str;

    fn from_context(ctx: &EnvContext) -> Result<Self, BuildEnvError>;
}

/// Identifies the environment an agent trains on.
#[derive(Clone)]
pub enum EnvSpec {
    /// A registered or built-in environment name.
    Name(String),
    /// A constructor to register under the given name.
    Constructor { name: String, creator: EnvCreator },
}

impl EnvSpec {
    /// Spec for a [`NamedEnv`] type.
    pub fn of<E: NamedEnv>() -> Self {
        Self::Constructor {
            name: E::NAME.to_string(),
            creator: Arc::new(
                |ctx: &EnvContext| -> Result<Box<dyn Environment>, BuildEnvError> {
                    Ok(Box::new(E::from_context(ctx)?))
                },
            ),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Constructor { name, .. } => name,
        }
    }
}

impl fmt::Debug for EnvSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Constructor { name, .. } => f
                .debug_struct("Constructor")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

impl From<&str> for EnvSpec {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for EnvSpec {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Register the spec's constructor if it carries one and return the environment name.
pub fn register_if_needed(spec: EnvSpec) -> String {
    match spec {
        EnvSpec::Name(name) => name,
        EnvSpec::Constructor { name, creator } => {
            register_creator(name.clone(), creator);
            name
        }
    }
}

/// Resolve the constructor for an environment name.
///
/// Registered constructors take precedence. Other names are looked up in the built-in library
/// when an environment is built, so unknown names fail at construction time.
/// Without a name the constructor always fails with [`BuildEnvError::NoEnvironment`].
pub fn resolve_env_creator(name: Option<&str>) -> EnvCreator {
    match name {
        Some(name) => lookup_env(name).unwrap_or_else(|| {
            let name = name.to_string();
            let creator: EnvCreator = Arc::new(move |ctx: &EnvContext| make(&name, ctx));
            creator
        }),
        None => Arc::new(
            |_: &EnvContext| -> Result<Box<dyn Environment>, BuildEnvError> {
                Err(BuildEnvError::NoEnvironment)
            },
        ),
    }
}
